use crate::ais_interface::VesselState;
use crate::classify::{GeneralStatus, ShipCategory};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Client-side view filter over the roster. Empty sets match everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterFilter {
    pub fleet_only: bool,
    pub categories: HashSet<ShipCategory>,
    pub speed_min: f64,
    pub speed_max: f64,
    pub statuses: HashSet<GeneralStatus>,
}

impl Default for RosterFilter {
    fn default() -> Self {
        Self {
            fleet_only: false,
            categories: HashSet::new(),
            speed_min: 0.0,
            speed_max: 100.0,
            statuses: HashSet::new(),
        }
    }
}

impl RosterFilter {
    pub fn matches(&self, vessel: &VesselState) -> bool {
        let category_ok = self.categories.is_empty()
            || self
                .categories
                .contains(&ShipCategory::from_type(vessel.vessel_type.as_deref()));

        // Vessels with no reported speed never pass the speed range.
        let speed_ok = vessel
            .speed
            .filter(|speed| speed.is_finite())
            .is_some_and(|speed| speed >= self.speed_min && speed <= self.speed_max);

        let status_ok = self.statuses.is_empty()
            || self
                .statuses
                .contains(&GeneralStatus::from_code(vessel.status));

        let fleet_ok = !self.fleet_only || vessel.is_in_fleet.unwrap_or(false);

        category_ok && speed_ok && status_ok && fleet_ok
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
