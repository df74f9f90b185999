use crate::ais_interface::GeoPoint;
use crate::prelude::{FeedError, FeedResult};
use serde::{Deserialize, Serialize};

/// Visible map rectangle as reported by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub north_west: GeoPoint,
    pub south_east: GeoPoint,
}

impl Viewport {
    pub fn new(north_west: GeoPoint, south_east: GeoPoint) -> Self {
        Self {
            north_west,
            south_east,
        }
    }

    /// Builds a viewport from the two latitude and two longitude limits.
    pub fn from_limits(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self::new(
            GeoPoint::new(max_lat, min_lon),
            GeoPoint::new(min_lat, max_lon),
        )
    }
}

/// Query rectangle sent to the bounds snapshot endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsQuery {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundsQuery {
    pub fn from_viewport(viewport: &Viewport) -> Self {
        Self {
            min_lat: viewport.south_east.lat,
            max_lat: viewport.north_west.lat,
            min_lon: viewport.north_west.lon,
            max_lon: viewport.south_east.lon,
        }
    }

    /// `start` query parameter: `<minLon>,<minLat>`.
    pub fn start_param(&self) -> String {
        format!("{},{}", self.min_lon, self.min_lat)
    }

    /// `end` query parameter: `<maxLon>,<maxLat>`.
    pub fn end_param(&self) -> String {
        format!("{},{}", self.max_lon, self.max_lat)
    }

    /// Parses the `start`/`end` pair, normalising the corner order.
    pub fn from_params(start: &str, end: &str) -> FeedResult<Self> {
        let (start_lon, start_lat) = parse_corner(start)?;
        let (end_lon, end_lat) = parse_corner(end)?;
        Ok(Self {
            min_lat: start_lat.min(end_lat),
            max_lat: start_lat.max(end_lat),
            min_lon: start_lon.min(end_lon),
            max_lon: start_lon.max(end_lon),
        })
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }
}

fn parse_corner(raw: &str) -> FeedResult<(f64, f64)> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 2 {
        return Err(FeedError::InvalidBounds(format!(
            "expected `x,y`, got `{}`",
            raw
        )));
    }
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FeedError::InvalidBounds(format!("non-numeric coordinate `{}`", value)))
    };
    Ok((parse(parts[0])?, parse(parts[1])?))
}
