use seaxcore::ais_interface::VesselState;
use seaxcore::classify::{nav_status, GeneralStatus, ShipCategory};
use seaxcore::pipeline::{NotificationBuffer, Roster, RosterFilter};
use seaxcore::transport::ConnectionState;

const HISTORY_LIMIT: usize = 20;
const LIST_LIMIT: usize = 25;

/// Text dashboard: the status line, a short history and table renderers.
#[derive(Debug, Default)]
pub struct Dashboard {
    status: String,
    history: Vec<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            status: "Waiting for the vessel feed...".into(),
            history: Vec::new(),
        }
    }

    pub fn publish_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        println!("[MAP] {}", self.status);
    }

    pub fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

pub fn summary_line(
    roster: &Roster,
    filter: &RosterFilter,
    notifications: &NotificationBuffer,
    positions: ConnectionState,
    violations: Option<ConnectionState>,
) -> String {
    let visible = roster.filtered(filter).count();
    let violations = violations
        .map(|state| state.to_string())
        .unwrap_or_else(|| "off".into());
    format!(
        "{} vessels ({} shown) | {} notifications | positions: {} | violations: {}",
        roster.len(),
        visible,
        notifications.count(),
        positions,
        violations
    )
}

pub fn vessel_rows<'a>(vessels: impl Iterator<Item = &'a VesselState>) -> Vec<String> {
    let mut vessels: Vec<&VesselState> = vessels.collect();
    vessels.sort_by_key(|vessel| vessel.mmsi);
    let total = vessels.len();

    let mut rows: Vec<String> = vessels
        .into_iter()
        .take(LIST_LIMIT)
        .map(vessel_row)
        .collect();
    if total > LIST_LIMIT {
        rows.push(format!("... {} more", total - LIST_LIMIT));
    }
    rows
}

fn vessel_row(vessel: &VesselState) -> String {
    let position = vessel
        .position()
        .map(|point| format!("{:>8.4} {:>9.4}", point.lat, point.lon))
        .unwrap_or_else(|| format!("{:>18}", "no fix"));
    let speed = vessel
        .speed
        .map(|speed| format!("{:>5.1} kn", speed))
        .unwrap_or_else(|| "    ? kn".into());
    let status = vessel
        .status
        .map(nav_status::describe)
        .unwrap_or("Not defined");
    format!(
        "{:>9} {:<20} {} {} {:<9} {:<10} {}{}",
        vessel.mmsi,
        vessel.name.as_deref().unwrap_or("-"),
        position,
        speed,
        ShipCategory::from_type(vessel.vessel_type.as_deref()).as_str(),
        GeneralStatus::from_code(vessel.status).as_str(),
        status,
        if vessel.is_in_fleet == Some(true) { " [fleet]" } else { "" }
    )
}

pub fn notification_rows(notifications: &NotificationBuffer) -> Vec<String> {
    notifications
        .iter()
        .map(|event| format!("{:<12} {:<9} {}", event.vid, event.kind_label(), event.summary()))
        .collect()
}

pub fn filter_line(filter: &RosterFilter) -> String {
    if filter.is_default() {
        return "no filters".into();
    }
    let mut categories: Vec<&str> = filter.categories.iter().map(|c| c.as_str()).collect();
    categories.sort_unstable();
    let mut statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
    statuses.sort_unstable();
    format!(
        "fleet only: {} | types: [{}] | statuses: [{}] | speed: {} - {}",
        filter.fleet_only,
        categories.join(", "),
        statuses.join(", "),
        filter.speed_min,
        filter.speed_max
    )
}
