use crate::generator::template::VesselTemplate;
use rand::{rngs::StdRng, Rng, SeedableRng};
use seaxcore::ais_interface::{BoundsQuery, GeoPoint, PositionRecord, VesselState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MMSI_BASE: u64 = 227_000_000;
const EPOCH_MS: i64 = 1_700_000_000_000;

/// Configuration for generating the synthetic fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub vessels: usize,
    pub seed: u64,
    pub area: BoundsQuery,
    /// Largest random course change per tick, in degrees.
    pub course_jitter: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            vessels: 40,
            seed: 0,
            area: BoundsQuery {
                min_lat: 47.8,
                max_lat: 48.6,
                min_lon: -5.4,
                max_lon: -4.3,
            },
            course_jitter: 4.0,
        }
    }
}

/// Fleet moved by dead reckoning inside a fixed area.
pub struct Fleet {
    vessels: Vec<VesselState>,
    area: BoundsQuery,
    course_jitter: f64,
    rng: StdRng,
    clock_ms: i64,
}

impl Fleet {
    pub fn generate(config: &FleetConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let area = config.area;
        let vessels = (0..config.vessels)
            .map(|index| {
                let template = VesselTemplate::pick(&mut rng);
                let status = template.draw_status(&mut rng);
                let course = rng.gen_range(0.0..360.0);
                VesselState {
                    mmsi: MMSI_BASE + index as u64,
                    name: Some(format!("{} {}", template.name_prefix, index + 1)),
                    latitude: Some(rng.gen_range(area.min_lat..=area.max_lat)),
                    longitude: Some(rng.gen_range(area.min_lon..=area.max_lon)),
                    speed: Some(template.draw_speed(&mut rng, status)),
                    course: Some(course),
                    heading: Some(course.round()),
                    rate_of_turn: Some(0),
                    timestamp: Some(EPOCH_MS),
                    vessel_type: Some(template.vessel_type.to_string()),
                    country: Some("France".into()),
                    status: Some(status),
                    is_in_fleet: None,
                }
            })
            .collect();

        Self {
            vessels,
            area,
            course_jitter: config.course_jitter.abs(),
            rng,
            clock_ms: EPOCH_MS,
        }
    }

    pub fn vessels(&self) -> &[VesselState] {
        &self.vessels
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn clock_ms(&self) -> i64 {
        self.clock_ms
    }

    /// Moves every vessel by `elapsed` and returns one record per vessel
    /// that moved.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<PositionRecord> {
        self.clock_ms += elapsed.as_millis() as i64;
        let hours = elapsed.as_secs_f64() / 3600.0;
        let mut records = Vec::new();

        for vessel in self.vessels.iter_mut() {
            let speed = vessel.speed.unwrap_or(0.0);
            let (Some(lat), Some(lon)) = (vessel.latitude, vessel.longitude) else {
                continue;
            };
            if speed <= 0.0 {
                continue;
            }

            let jitter = if self.course_jitter > 0.0 {
                self.rng.gen_range(-self.course_jitter..=self.course_jitter)
            } else {
                0.0
            };
            let mut course = (vessel.course.unwrap_or(0.0) + jitter).rem_euclid(360.0);
            let mut next = dead_reckon(GeoPoint::new(lat, lon), course, speed * hours);
            if !self.area.contains(next) {
                course = (course + 180.0).rem_euclid(360.0);
                next = dead_reckon(GeoPoint::new(lat, lon), course, speed * hours);
            }

            vessel.latitude = Some(next.lat.clamp(self.area.min_lat, self.area.max_lat));
            vessel.longitude = Some(next.lon.clamp(self.area.min_lon, self.area.max_lon));
            vessel.course = Some(course);
            vessel.heading = Some(course.round());
            vessel.rate_of_turn = Some((jitter * 60.0 / elapsed.as_secs_f64().max(1.0)).round() as i32);
            vessel.timestamp = Some(self.clock_ms);
            records.push(to_record(vessel));
        }
        records
    }
}

/// Vessels whose position lies in `query`.
pub fn within(vessels: &[VesselState], query: &BoundsQuery) -> Vec<VesselState> {
    vessels
        .iter()
        .filter(|vessel| vessel.position().is_some_and(|point| query.contains(point)))
        .cloned()
        .collect()
}

fn to_record(vessel: &VesselState) -> PositionRecord {
    PositionRecord {
        sourcemmsi: vessel.mmsi,
        lat: vessel.latitude,
        lon: vessel.longitude,
        speedoverground: vessel.speed,
        courseoverground: vessel.course,
        trueheading: vessel.heading,
        navigationalstatus: vessel.status,
        rateofturn: vessel.rate_of_turn,
        timestamp: vessel.timestamp,
        name: None,
        vessel_type: None,
        country: None,
    }
}

/// Flat-earth step of `distance_nm` along `course` degrees.
pub fn dead_reckon(from: GeoPoint, course: f64, distance_nm: f64) -> GeoPoint {
    let radians = course.to_radians();
    let dlat = distance_nm * radians.cos() / 60.0;
    let dlon = distance_nm * radians.sin() / (60.0 * from.lat.to_radians().cos().max(1e-6));
    GeoPoint::new(from.lat + dlat, from.lon + dlon)
}

/// Distance in nautical miles between two nearby points.
pub fn distance_nm(a: GeoPoint, b: GeoPoint) -> f64 {
    let mean_lat = ((a.lat + b.lat) / 2.0).to_radians();
    let dlat = (a.lat - b.lat) * 60.0;
    let dlon = (a.lon - b.lon) * 60.0 * mean_lat.cos();
    (dlat * dlat + dlon * dlon).sqrt()
}
