use rand::Rng;

/// Archetype a synthetic vessel is drawn from.
#[derive(Debug, Clone, Copy)]
pub struct VesselTemplate {
    pub vessel_type: &'static str,
    pub name_prefix: &'static str,
    pub speed_knots: (f64, f64),
    /// Navigational status codes; the first one is the most likely.
    pub statuses: &'static [u8],
}

pub const TEMPLATES: [VesselTemplate; 7] = [
    VesselTemplate {
        vessel_type: "Cargo",
        name_prefix: "ATLANTIC TRADER",
        speed_knots: (8.0, 16.0),
        statuses: &[0, 1, 5],
    },
    VesselTemplate {
        vessel_type: "Tanker",
        name_prefix: "IROISE SPIRIT",
        speed_knots: (6.0, 14.0),
        statuses: &[0, 1],
    },
    VesselTemplate {
        vessel_type: "Passenger",
        name_prefix: "PENN AR BED",
        speed_knots: (10.0, 20.0),
        statuses: &[0, 5],
    },
    VesselTemplate {
        vessel_type: "Fishing",
        name_prefix: "AR VRO",
        speed_knots: (0.0, 9.0),
        statuses: &[7, 0],
    },
    VesselTemplate {
        vessel_type: "SailingVessel",
        name_prefix: "KORRIGAN",
        speed_knots: (2.0, 8.0),
        statuses: &[8, 0],
    },
    VesselTemplate {
        vessel_type: "Tug",
        name_prefix: "ABEILLE",
        speed_knots: (0.0, 12.0),
        statuses: &[0, 3],
    },
    VesselTemplate {
        vessel_type: "Dredger",
        name_prefix: "SABLIER",
        speed_knots: (0.0, 4.0),
        statuses: &[3, 5],
    },
];

impl VesselTemplate {
    pub fn pick<R: Rng>(rng: &mut R) -> &'static VesselTemplate {
        &TEMPLATES[rng.gen_range(0..TEMPLATES.len())]
    }

    pub fn draw_status<R: Rng>(&self, rng: &mut R) -> u8 {
        if rng.gen_bool(0.7) {
            self.statuses[0]
        } else {
            self.statuses[rng.gen_range(0..self.statuses.len())]
        }
    }

    /// Moored and anchored vessels do not move.
    pub fn draw_speed<R: Rng>(&self, rng: &mut R, status: u8) -> f64 {
        if matches!(status, 1 | 5) {
            return 0.0;
        }
        let (low, high) = self.speed_knots;
        rng.gen_range(low..=high)
    }
}
