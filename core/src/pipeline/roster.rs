use crate::ais_interface::{GeoPoint, VesselPatch, VesselState};
use crate::pipeline::filter::RosterFilter;
use std::collections::HashMap;

/// Authoritative set of currently displayed vessels, keyed by MMSI.
///
/// Fed by two sources: whole-roster replacement from a bounds snapshot and
/// single-vessel upserts from the position stream.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    vessels: HashMap<u64, VesselState>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole content with `vessels`.
    ///
    /// A vessel that was already present keeps its fleet flag when the new
    /// record does not carry one; every other field comes from the snapshot.
    pub fn seed(&mut self, vessels: Vec<VesselState>) {
        let mut previous = std::mem::take(&mut self.vessels);
        self.vessels.reserve(vessels.len());

        for mut vessel in vessels {
            if vessel.is_in_fleet.is_none() {
                vessel.is_in_fleet = previous
                    .remove(&vessel.mmsi)
                    .and_then(|prior| prior.is_in_fleet);
            }
            self.vessels.insert(vessel.mmsi, vessel);
        }
    }

    /// Inserts a new vessel built from `patch`, or merges `patch` over the
    /// existing record. Returns `true` when the vessel was new.
    pub fn upsert(&mut self, mmsi: u64, patch: &VesselPatch) -> bool {
        let mut inserted = false;
        let state = self.vessels.entry(mmsi).or_insert_with(|| {
            inserted = true;
            VesselState::new(mmsi)
        });
        state.apply(patch);
        inserted
    }

    /// Current content for rendering. No ordering guarantee.
    pub fn snapshot(&self) -> Vec<VesselState> {
        self.vessels.values().cloned().collect()
    }

    /// Vessels passing `filter`, borrowed.
    pub fn filtered<'a>(&'a self, filter: &'a RosterFilter) -> impl Iterator<Item = &'a VesselState> {
        self.vessels.values().filter(move |vessel| filter.matches(vessel))
    }

    pub fn get(&self, mmsi: u64) -> Option<&VesselState> {
        self.vessels.get(&mmsi)
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    /// Records the outcome of a fleet add/remove. Returns `false` when the
    /// vessel is not in the roster.
    pub fn set_fleet_membership(&mut self, mmsi: u64, in_fleet: bool) -> bool {
        match self.vessels.get_mut(&mmsi) {
            Some(vessel) => {
                vessel.is_in_fleet = Some(in_fleet);
                true
            }
            None => false,
        }
    }

    /// Coordinates to center the view on, if the vessel has a usable fix.
    pub fn track(&self, mmsi: u64) -> Option<GeoPoint> {
        self.vessels.get(&mmsi).and_then(VesselState::position)
    }

    pub fn clear(&mut self) {
        self.vessels.clear();
    }
}
