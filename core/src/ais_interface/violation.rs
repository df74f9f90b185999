use serde::{Deserialize, Serialize};

/// Vessel reference carried by a zone violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneVessel {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MMSI", default, skip_serializing_if = "Option::is_none")]
    pub mmsi: Option<u64>,
}

/// Constraint set of the zone of interest that was violated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneConstraints {
    #[serde(rename = "Types", default)]
    pub types: Vec<String>,
    #[serde(rename = "Status", default)]
    pub status: Vec<u8>,
    #[serde(rename = "Speed_min", default)]
    pub speed_min: Option<f64>,
    #[serde(rename = "Speed_max", default)]
    pub speed_max: Option<f64>,
}

impl ZoneConstraints {
    fn describe(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if !self.types.is_empty() {
            parts.push(format!("Type(s): {}", self.types.join(", ")));
        }
        if !self.status.is_empty() {
            let codes: Vec<String> = self.status.iter().map(|code| code.to_string()).collect();
            parts.push(format!("Status: {}", codes.join(", ")));
        }
        if self.speed_min.is_some() || self.speed_max.is_some() {
            let bound = |value: Option<f64>| value.map_or_else(|| "?".to_string(), |v| v.to_string());
            parts.push(format!(
                "Speed: {} - {}",
                bound(self.speed_min),
                bound(self.speed_max)
            ));
        }
        parts
    }
}

/// Variant payload of a violation event, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViolationKind {
    Zone {
        vessel: ZoneVessel,
        #[serde(default)]
        constraints: ZoneConstraints,
    },
    Collision {
        #[serde(rename = "vesselA")]
        vessel_a: String,
        #[serde(rename = "vesselB")]
        vessel_b: String,
    },
}

/// Notification published on `violations/{userId}`. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub vid: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl ViolationEvent {
    pub fn zone(vid: impl Into<String>, vessel: ZoneVessel, constraints: ZoneConstraints) -> Self {
        Self {
            vid: vid.into(),
            kind: ViolationKind::Zone {
                vessel,
                constraints,
            },
        }
    }

    pub fn collision(
        vid: impl Into<String>,
        vessel_a: impl Into<String>,
        vessel_b: impl Into<String>,
    ) -> Self {
        Self {
            vid: vid.into(),
            kind: ViolationKind::Collision {
                vessel_a: vessel_a.into(),
                vessel_b: vessel_b.into(),
            },
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ViolationKind::Zone { .. } => "zone",
            ViolationKind::Collision { .. } => "collision",
        }
    }

    /// One-line text shown in the notification list.
    pub fn summary(&self) -> String {
        match &self.kind {
            ViolationKind::Zone {
                vessel,
                constraints,
            } => {
                let parts = constraints.describe();
                if parts.is_empty() {
                    format!("{} violated the zone of interest", vessel.name)
                } else {
                    format!("{} violated: {}", vessel.name, parts.join("; "))
                }
            }
            ViolationKind::Collision { vessel_a, vessel_b } => {
                format!("{} and {} risk collision", vessel_a, vessel_b)
            }
        }
    }
}
