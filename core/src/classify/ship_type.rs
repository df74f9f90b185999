use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse vessel category used by the map filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipCategory {
    Cargo,
    Tanker,
    Pleasure,
    Passenger,
    Fishing,
    Special,
    Misc,
}

impl ShipCategory {
    pub const ALL: [ShipCategory; 7] = [
        ShipCategory::Cargo,
        ShipCategory::Tanker,
        ShipCategory::Pleasure,
        ShipCategory::Passenger,
        ShipCategory::Fishing,
        ShipCategory::Special,
        ShipCategory::Misc,
    ];

    /// Maps a reported vessel type (case-insensitive) to its category.
    /// Unknown or missing types fall into `Misc`.
    pub fn from_type(vessel_type: Option<&str>) -> Self {
        let Some(raw) = vessel_type else {
            return ShipCategory::Misc;
        };
        match raw.trim().to_lowercase().as_str() {
            "cargo"
            | "cargo-hazarda(major)"
            | "cargo-hazardb"
            | "cargo-hazardc(minor)"
            | "cargo-hazardd(recognizable)" => ShipCategory::Cargo,
            "tanker"
            | "tanker-hazarda(major)"
            | "tanker-hazardb"
            | "tanker-hazardc(minor)"
            | "tanker-hazardd(recognizable)" => ShipCategory::Tanker,
            "pleasure" | "pleasurecraft" | "sailingvessel" => ShipCategory::Pleasure,
            "passenger" | "high-speedcraft" => ShipCategory::Passenger,
            "fishing" => ShipCategory::Fishing,
            "special" | "specialcraft" | "pilotvessel" | "tug" | "sar" | "lawenforce"
            | "militaryops" | "dredger" | "anti-pollution" | "wingingrnd" | "divevessel"
            | "localvessel" => ShipCategory::Special,
            _ => ShipCategory::Misc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipCategory::Cargo => "cargo",
            ShipCategory::Tanker => "tanker",
            ShipCategory::Pleasure => "pleasure",
            ShipCategory::Passenger => "passenger",
            ShipCategory::Fishing => "fishing",
            ShipCategory::Special => "special",
            ShipCategory::Misc => "misc",
        }
    }
}

impl fmt::Display for ShipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown ship category `{}`", s))
    }
}
