use crate::classify::nav_status;
use serde::{Deserialize, Deserializer, Serialize};

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One vessel as held in the roster and as returned by a bounds snapshot.
///
/// Everything but `mmsi` may be unknown until a snapshot or an incremental
/// update supplies it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselState {
    pub mmsi: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_of_turn: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, rename = "type")]
    pub vessel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// AIS status code. The bounds endpoint may send the description
    /// instead, which is mapped back to its code.
    #[serde(default, deserialize_with = "status_code")]
    pub status: Option<u8>,
    /// Set by the fleet toggle or by an authenticated snapshot, never derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_in_fleet: Option<bool>,
}

impl VesselState {
    pub fn new(mmsi: u64) -> Self {
        Self {
            mmsi,
            ..Default::default()
        }
    }

    /// Overwrites exactly the fields the patch carries.
    pub fn apply(&mut self, patch: &VesselPatch) {
        fn merge<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) {
            if let Some(value) = incoming {
                *slot = Some(value.clone());
            }
        }

        merge(&mut self.latitude, &patch.latitude);
        merge(&mut self.longitude, &patch.longitude);
        merge(&mut self.speed, &patch.speed);
        merge(&mut self.course, &patch.course);
        merge(&mut self.heading, &patch.heading);
        merge(&mut self.rate_of_turn, &patch.rate_of_turn);
        merge(&mut self.timestamp, &patch.timestamp);
        merge(&mut self.status, &patch.status);
        merge(&mut self.vessel_type, &patch.vessel_type);
        merge(&mut self.name, &patch.name);
        merge(&mut self.country, &patch.country);
    }

    /// Coordinates usable for centering the view, if both are known and finite.
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(GeoPoint::new(lat, lon))
            }
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusWire {
    Code(u8),
    Text(String),
}

fn status_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    Ok(match Option::<StatusWire>::deserialize(deserializer)? {
        Some(StatusWire::Code(code)) => Some(code),
        Some(StatusWire::Text(text)) => nav_status::code_of(&text),
        None => None,
    })
}

/// Fields carried by one incremental update; `None` means "not in this event".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VesselPatch {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub heading: Option<f64>,
    pub rate_of_turn: Option<i32>,
    pub timestamp: Option<i64>,
    pub status: Option<u8>,
    pub vessel_type: Option<String>,
    pub name: Option<String>,
    pub country: Option<String>,
}

/// Position record as published on the `ais-data` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub sourcemmsi: u64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub speedoverground: Option<f64>,
    #[serde(default)]
    pub courseoverground: Option<f64>,
    #[serde(default)]
    pub trueheading: Option<f64>,
    #[serde(default)]
    pub navigationalstatus: Option<u8>,
    #[serde(default)]
    pub rateofturn: Option<i32>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub vessel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl PositionRecord {
    pub fn mmsi(&self) -> u64 {
        self.sourcemmsi
    }

    pub fn to_patch(&self) -> VesselPatch {
        VesselPatch {
            latitude: self.lat,
            longitude: self.lon,
            speed: self.speedoverground,
            course: self.courseoverground,
            heading: self.trueheading,
            rate_of_turn: self.rateofturn,
            timestamp: self.timestamp,
            status: self.navigationalstatus,
            vessel_type: self.vessel_type.clone(),
            name: self.name.clone(),
            country: self.country.clone(),
        }
    }
}
