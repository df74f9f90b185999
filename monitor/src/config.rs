use anyhow::Context;
use seaxcore::ais_interface::Viewport;
use seaxcore::prelude::{ConnectionConfig, FetchConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Initial map rectangle, given by its latitude and longitude limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportLimits {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl ViewportLimits {
    pub fn to_viewport(&self) -> Viewport {
        Viewport::from_limits(self.min_lat, self.min_lon, self.max_lat, self.max_lon)
    }
}

impl Default for ViewportLimits {
    // Iroise sea / approaches to Brest.
    fn default() -> Self {
        Self {
            min_lat: 46.5,
            min_lon: -7.5,
            max_lat: 49.5,
            max_lon: -1.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub api_url: String,
    pub ws_url: String,
    pub user_id: Option<u64>,
    pub viewport: ViewportLimits,
    pub connection: ConnectionConfig,
    pub fetch: FetchConfig,
    pub report_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            ws_url: "ws://127.0.0.1:8080/ws".into(),
            user_id: None,
            viewport: ViewportLimits::default(),
            connection: ConnectionConfig::default(),
            fetch: FetchConfig::default(),
            report_interval_ms: 5_000,
        }
    }
}

impl MonitorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading monitor config {}", path_ref.display()))?;
        let config: MonitorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing monitor config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(api_url: String, ws_url: String, user_id: Option<u64>) -> Self {
        Self {
            api_url,
            ws_url,
            user_id,
            ..Default::default()
        }
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms.max(100))
    }

    pub fn violations_topic(&self) -> Option<String> {
        self.user_id.map(|id| format!("violations/{}", id))
    }
}
