use crate::generator::profile::distance_nm;
use seaxcore::ais_interface::{BoundsQuery, VesselState, ViolationEvent, ZoneConstraints, ZoneVessel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Zone of interest: a rectangle plus the allowed types, statuses and speeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub name: String,
    pub area: BoundsQuery,
    pub constraints: ZoneConstraints,
}

impl Default for ZoneConfig {
    // Goulet de Brest: tankers kept out, 12 knot ceiling.
    fn default() -> Self {
        Self {
            name: "goulet".into(),
            area: BoundsQuery {
                min_lat: 48.30,
                max_lat: 48.40,
                min_lon: -4.70,
                max_lon: -4.45,
            },
            constraints: ZoneConstraints {
                types: vec![
                    "Cargo".into(),
                    "Passenger".into(),
                    "Fishing".into(),
                    "SailingVessel".into(),
                    "Tug".into(),
                ],
                status: Vec::new(),
                speed_min: None,
                speed_max: Some(12.0),
            },
        }
    }
}

impl ZoneConfig {
    /// Whether `vessel` is inside the zone and breaks at least one constraint.
    pub fn is_breached_by(&self, vessel: &VesselState) -> bool {
        let Some(point) = vessel.position() else {
            return false;
        };
        if !self.area.contains(point) {
            return false;
        }

        let rules = &self.constraints;
        let speed = vessel.speed.unwrap_or(0.0);
        let too_fast = rules.speed_max.is_some_and(|max| speed > max);
        let too_slow = rules.speed_min.is_some_and(|min| speed < min);
        let type_refused = !rules.types.is_empty()
            && !vessel
                .vessel_type
                .as_ref()
                .is_some_and(|kind| rules.types.iter().any(|allowed| allowed.eq_ignore_ascii_case(kind)));
        let status_refused = !rules.status.is_empty()
            && !vessel
                .status
                .is_some_and(|code| rules.status.contains(&code));

        too_fast || too_slow || type_refused || status_refused
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Breach {
    Zone { zone: usize, mmsi: u64 },
    Collision { a: u64, b: u64 },
}

/// Periodic zone and proximity check. An event is raised when a breach
/// starts; it is raised again only after the breach has ended.
pub struct RuleEngine {
    zones: Vec<ZoneConfig>,
    collision_distance_nm: f64,
    active: HashSet<Breach>,
    next_vid: u64,
}

impl RuleEngine {
    pub fn new(zones: Vec<ZoneConfig>, collision_distance_nm: f64) -> Self {
        Self {
            zones,
            collision_distance_nm,
            active: HashSet::new(),
            next_vid: 1,
        }
    }

    pub fn evaluate(&mut self, vessels: &[VesselState]) -> Vec<ViolationEvent> {
        let mut current = HashSet::new();
        let mut events = Vec::new();

        for (index, zone) in self.zones.iter().enumerate() {
            for vessel in vessels.iter().filter(|vessel| zone.is_breached_by(vessel)) {
                let breach = Breach::Zone {
                    zone: index,
                    mmsi: vessel.mmsi,
                };
                current.insert(breach);
                if !self.active.contains(&breach) {
                    let vid = format!("zone-{}", self.next_vid);
                    self.next_vid += 1;
                    events.push(ViolationEvent::zone(
                        vid,
                        ZoneVessel {
                            name: display_name(vessel),
                            mmsi: Some(vessel.mmsi),
                        },
                        zone.constraints.clone(),
                    ));
                }
            }
        }

        if self.collision_distance_nm > 0.0 {
            for (i, first) in vessels.iter().enumerate() {
                let Some(p) = first.position() else { continue };
                for second in &vessels[i + 1..] {
                    let Some(q) = second.position() else { continue };
                    if distance_nm(p, q) >= self.collision_distance_nm {
                        continue;
                    }
                    let breach = Breach::Collision {
                        a: first.mmsi.min(second.mmsi),
                        b: first.mmsi.max(second.mmsi),
                    };
                    current.insert(breach);
                    if !self.active.contains(&breach) {
                        let vid = format!("collision-{}", self.next_vid);
                        self.next_vid += 1;
                        events.push(ViolationEvent::collision(
                            vid,
                            display_name(first),
                            display_name(second),
                        ));
                    }
                }
            }
        }

        self.active = current;
        events
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

fn display_name(vessel: &VesselState) -> String {
    vessel
        .name
        .clone()
        .unwrap_or_else(|| vessel.mmsi.to_string())
}
