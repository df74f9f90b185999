use log::debug;
use seaxcore::ais_interface::{BoundsQuery, VesselState};
use seaxcore::prelude::{FeedError, FeedResult, HealthProbe, SnapshotSource};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct HealthStatus {
    status: String,
}

/// REST side of the backend: readiness checks and bounds snapshots.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn health_url(&self) -> String {
        format!("{}/actuator/health", self.base_url)
    }

    pub fn positions_url(&self) -> String {
        format!("{}/api/vessels/positions", self.base_url)
    }
}

impl HealthProbe for HttpBackend {
    fn is_healthy(&self) -> impl Future<Output = bool> + Send {
        let request = self.client.get(self.health_url());
        async move {
            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    debug!("health check failed: {}", err);
                    return false;
                }
            };
            match response.json::<HealthStatus>().await {
                Ok(health) => health.status.eq_ignore_ascii_case("UP"),
                Err(err) => {
                    debug!("health check returned an unreadable body: {}", err);
                    false
                }
            }
        }
    }
}

impl SnapshotSource for HttpBackend {
    fn fetch(&self, query: &BoundsQuery) -> impl Future<Output = FeedResult<Vec<VesselState>>> + Send {
        let request = self
            .client
            .get(self.positions_url())
            .query(&[("start", query.start_param()), ("end", query.end_param())]);
        async move {
            let response = request
                .send()
                .await
                .map_err(|e| FeedError::Fetch(e.to_string()))?;
            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_else(|_| "".into());
                return Err(FeedError::Fetch(format!("{}: {}", status, text)));
            }
            response
                .json::<Vec<VesselState>>()
                .await
                .map_err(|e| FeedError::Fetch(e.to_string()))
        }
    }
}
