use crate::generator::profile;
use seaxcore::ais_interface::{BoundsQuery, VesselState};
use serde::{Deserialize, Serialize};

/// What the HTTP side serves: the latest fleet picture and the health flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeModel {
    pub healthy: bool,
    pub ticks: u64,
    pub clock_ms: i64,
    pub vessels: Vec<VesselState>,
}

impl Default for BridgeModel {
    fn default() -> Self {
        Self {
            healthy: true,
            ticks: 0,
            clock_ms: 0,
            vessels: Vec::new(),
        }
    }
}

impl BridgeModel {
    pub fn within(&self, query: &BoundsQuery) -> Vec<VesselState> {
        profile::within(&self.vessels, query)
    }
}
