use crate::generator::profile::FleetConfig;
use crate::workflow::rules::ZoneConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub bind: SocketAddr,
    pub user_id: u64,
    pub tick_ms: u64,
    pub fleet: FleetConfig,
    pub zones: Vec<ZoneConfig>,
    /// Pairs closer than this, in nautical miles, raise a collision event.
    pub collision_distance_nm: f64,
    /// Chance that an event is published a second time.
    pub duplicate_probability: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            user_id: 1,
            tick_ms: 1_000,
            fleet: FleetConfig::default(),
            zones: vec![ZoneConfig::default()],
            collision_distance_nm: 0.25,
            duplicate_probability: 0.1,
        }
    }
}

impl ScenarioConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scenario config {}", path_ref.display()))?;
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scenario config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(vessels: usize, seed: u64, user_id: u64) -> Self {
        Self {
            user_id,
            fleet: FleetConfig {
                vessels,
                seed,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }

    pub fn violations_destination(&self) -> String {
        format!("/topic/violations/{}", self.user_id)
    }
}
