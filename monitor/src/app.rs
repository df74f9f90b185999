use crate::console::commands::{ConsoleCommand, HELP};
use crate::console::view::{self, Dashboard};
use log::{debug, warn};
use seaxcore::ais_interface::{GeoPoint, PositionRecord, Viewport, ViolationEvent};
use seaxcore::pipeline::{FetchCoordinator, FetchOutcome, NotificationBuffer, Roster, RosterFilter};
use seaxcore::transport::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Single owner of the roster, the notification list and the view filter.
///
/// Every feed callback and console command is funnelled into this struct
/// from one task, so none of the state needs locking.
pub struct App {
    roster: Roster,
    notifications: NotificationBuffer,
    filter: RosterFilter,
    dashboard: Dashboard,
    fetcher: FetchCoordinator,
    viewport: Viewport,
    applied_seq: u64,
}

impl App {
    pub fn new(fetcher: FetchCoordinator, viewport: Viewport) -> Self {
        Self {
            roster: Roster::new(),
            notifications: NotificationBuffer::new(),
            filter: RosterFilter::default(),
            dashboard: Dashboard::new(),
            fetcher,
            viewport,
            applied_seq: 0,
        }
    }

    /// Loads the initial viewport without waiting for the quiet period.
    pub fn start(&mut self) {
        self.dashboard.publish_status("Loading vessels in view...");
        self.fetcher.fetch_now(&self.viewport);
    }

    pub fn on_position(&mut self, record: PositionRecord) {
        let mmsi = record.mmsi();
        if self.roster.upsert(mmsi, &record.to_patch()) {
            debug!("vessel {} entered the roster", mmsi);
        }
    }

    pub fn on_violation(&mut self, event: ViolationEvent) {
        let summary = event.summary();
        if self.notifications.receive(event) {
            self.dashboard.publish_status(format!("New violation: {}", summary));
            self.dashboard.push_history(summary);
        } else {
            debug!("duplicate violation ignored: {}", summary);
        }
    }

    pub fn on_fetch(&mut self, outcome: FetchOutcome) {
        if outcome.seq <= self.applied_seq {
            debug!("discarding snapshot #{} older than #{}", outcome.seq, self.applied_seq);
            return;
        }
        self.applied_seq = outcome.seq;
        match outcome.apply(&mut self.roster) {
            Ok(count) => {
                self.dashboard
                    .publish_status(format!("Loaded {} vessels in view", count));
                self.dashboard.push_history(format!("Snapshot: {} vessels", count));
            }
            Err(err) => {
                warn!("{}", err);
                self.dashboard.publish_status("Failed to fetch vessels");
            }
        }
    }

    pub fn on_command(&mut self, command: ConsoleCommand) -> Flow {
        match command {
            ConsoleCommand::View(viewport) => self.move_to(viewport),
            ConsoleCommand::Dismiss(vid) => match self.notifications.dismiss(&vid) {
                Some(_) => self.dashboard.publish_status(format!("Dismissed {}", vid)),
                None => self.dashboard.publish_status(format!("No notification {}", vid)),
            },
            ConsoleCommand::Track(mmsi) => match self.roster.track(mmsi) {
                Some(point) => {
                    self.dashboard.publish_status(format!(
                        "Tracking {} at {:.4}, {:.4}",
                        mmsi, point.lat, point.lon
                    ));
                    let target = recentre(&self.viewport, point);
                    self.move_to(target);
                }
                None => self
                    .dashboard
                    .publish_status(format!("Vessel coordinates not found ({})", mmsi)),
            },
            ConsoleCommand::Fleet { mmsi, in_fleet } => {
                if self.roster.set_fleet_membership(mmsi, in_fleet) {
                    let verb = if in_fleet { "added to" } else { "removed from" };
                    self.dashboard
                        .publish_status(format!("Vessel {} {} my fleet", mmsi, verb));
                } else {
                    self.dashboard
                        .publish_status(format!("Vessel {} is not in view", mmsi));
                }
            }
            ConsoleCommand::FilterFleet(on) => {
                self.filter.fleet_only = on;
                self.publish_filter();
            }
            ConsoleCommand::FilterTypes(categories) => {
                self.filter.categories = categories;
                self.publish_filter();
            }
            ConsoleCommand::FilterStatuses(statuses) => {
                self.filter.statuses = statuses;
                self.publish_filter();
            }
            ConsoleCommand::FilterSpeed(min, max) => {
                self.filter.speed_min = min;
                self.filter.speed_max = max;
                self.publish_filter();
            }
            ConsoleCommand::FilterClear => {
                self.filter = RosterFilter::default();
                self.publish_filter();
            }
            ConsoleCommand::List => {
                for row in view::vessel_rows(self.roster.filtered(&self.filter)) {
                    println!("{}", row);
                }
            }
            ConsoleCommand::Notes => {
                if self.notifications.is_empty() {
                    println!("no notifications");
                }
                for row in view::notification_rows(&self.notifications) {
                    println!("{}", row);
                }
                for entry in self.dashboard.history() {
                    println!("  - {}", entry);
                }
            }
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    pub fn report(&self, positions: ConnectionState, violations: Option<ConnectionState>) -> String {
        view::summary_line(
            &self.roster,
            &self.filter,
            &self.notifications,
            positions,
            violations,
        )
    }

    /// Stops any pending fetch and forgets the session's notifications.
    pub fn shutdown(&mut self) {
        self.fetcher.cancel();
        self.notifications.clear();
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn notifications(&self) -> &NotificationBuffer {
        &self.notifications
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn move_to(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.fetcher.on_viewport_change(&viewport);
    }

    fn publish_filter(&mut self) {
        let line = view::filter_line(&self.filter);
        self.dashboard.publish_status(format!("Filter: {}", line));
    }
}

/// Same span as `viewport`, centred on `point`.
fn recentre(viewport: &Viewport, point: GeoPoint) -> Viewport {
    let half_lat = (viewport.north_west.lat - viewport.south_east.lat).abs() / 2.0;
    let half_lon = (viewport.south_east.lon - viewport.north_west.lon).abs() / 2.0;
    Viewport::new(
        GeoPoint::new(point.lat + half_lat, point.lon - half_lon),
        GeoPoint::new(point.lat - half_lat, point.lon + half_lon),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use seaxcore::ais_interface::{BoundsQuery, VesselState};
    use seaxcore::prelude::{FeedError, FeedResult, FetchConfig, SnapshotSource};
    use std::future::Future;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    #[derive(Default)]
    struct StubSource {
        queries: Mutex<Vec<BoundsQuery>>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl SnapshotSource for StubSource {
        fn fetch(&self, query: &BoundsQuery) -> impl Future<Output = FeedResult<Vec<VesselState>>> + Send {
            self.queries.lock().unwrap().push(*query);
            let fail = self.fail;
            let delay = self.delay;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if fail {
                    return Err(FeedError::Fetch("500 Internal Server Error".into()));
                }
                let mut vessel = VesselState::new(228_000_001);
                vessel.latitude = Some(48.0);
                vessel.longitude = Some(-5.0);
                vessel.speed = Some(9.0);
                Ok(vec![vessel])
            }
        }
    }

    fn app(source: Arc<StubSource>) -> (App, UnboundedReceiver<FetchOutcome>) {
        let config = FetchConfig { quiet_period_ms: 400 };
        let (fetcher, outcomes) = FetchCoordinator::new(source, &config);
        let viewport = Viewport::from_limits(47.0, -6.0, 49.0, -3.0);
        (App::new(fetcher, viewport), outcomes)
    }

    fn record(mmsi: u64, lat: f64) -> PositionRecord {
        serde_json::from_value(serde_json::json!({
            "sourcemmsi": mmsi,
            "lat": lat,
            "lon": -4.5,
            "speedoverground": 3.0,
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn start_seeds_roster_from_snapshot() {
        let (mut app, mut outcomes) = app(Arc::new(StubSource::default()));
        app.on_position(record(1, 47.5));
        app.start();
        let outcome = outcomes.recv().await.unwrap();
        app.on_fetch(outcome);

        assert_eq!(app.roster().len(), 1);
        assert!(app.roster().get(228_000_001).is_some());
        assert!(app.roster().get(1).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_snapshot_keeps_roster() {
        let source = Arc::new(StubSource {
            fail: true,
            ..Default::default()
        });
        let (mut app, mut outcomes) = app(source);
        app.on_position(record(1, 47.5));
        app.start();
        app.on_fetch(outcomes.recv().await.unwrap());

        assert_eq!(app.roster().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn older_snapshot_arriving_late_is_discarded() {
        let (mut app, _outcomes) = app(Arc::new(StubSource::default()));
        let query = BoundsQuery::from_viewport(&app.viewport());
        app.on_fetch(FetchOutcome {
            seq: 2,
            query,
            result: Ok(vec![VesselState::new(20)]),
        });
        app.on_fetch(FetchOutcome {
            seq: 1,
            query,
            result: Ok(vec![VesselState::new(10)]),
        });

        assert_eq!(app.roster().len(), 1);
        assert!(app.roster().get(20).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_seed_roster_while_panning_against_slow_backend() {
        let source = Arc::new(StubSource {
            delay: Some(Duration::from_millis(600)),
            ..Default::default()
        });
        let (mut app, mut outcomes) = app(Arc::clone(&source));

        let mut seeded = 0;
        for step in 0..5 {
            app.on_command(ConsoleCommand::View(Viewport::from_limits(
                47.0 + step as f64 * 0.1,
                -6.0,
                49.0,
                -3.0,
            )));
            tokio::time::sleep(Duration::from_millis(500)).await;
            while let Ok(outcome) = outcomes.try_recv() {
                app.on_fetch(outcome);
                seeded += 1;
            }
        }

        assert_eq!(source.queries.lock().unwrap().len(), 5);
        assert!(seeded >= 3);
        assert_eq!(app.roster().len(), 1);
    }

    #[tokio::test]
    async fn positions_update_in_place() {
        let (mut app, _outcomes) = app(Arc::new(StubSource::default()));
        app.on_position(record(7, 47.5));
        app.on_position(record(7, 47.6));
        assert_eq!(app.roster().len(), 1);
        assert_eq!(app.roster().get(7).unwrap().latitude, Some(47.6));
    }

    #[tokio::test]
    async fn violations_are_deduplicated_and_dismissable() {
        let (mut app, _outcomes) = app(Arc::new(StubSource::default()));
        app.on_violation(ViolationEvent::collision("v1", "A", "B"));
        app.on_violation(ViolationEvent::collision("v1", "A", "B"));
        app.on_violation(ViolationEvent::collision("v2", "C", "D"));
        assert_eq!(app.notifications().count(), 2);

        assert_eq!(app.on_command(ConsoleCommand::Dismiss("v1".into())), Flow::Continue);
        assert_eq!(app.notifications().count(), 1);
        app.on_command(ConsoleCommand::Dismiss("missing".into()));
        assert_eq!(app.notifications().count(), 1);

        app.shutdown();
        assert!(app.notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tracking_recentres_viewport_on_vessel() {
        let source = Arc::new(StubSource::default());
        let (mut app, _outcomes) = app(Arc::clone(&source));
        app.on_position(record(7, 48.5));

        app.on_command(ConsoleCommand::Track(7));
        let viewport = app.viewport();
        assert!((viewport.north_west.lat - 49.5).abs() < 1e-9);
        assert!((viewport.south_east.lat - 47.5).abs() < 1e-9);
        assert!((viewport.north_west.lon - -6.0).abs() < 1e-9);
        assert!((viewport.south_east.lon - -3.0).abs() < 1e-9);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(source.queries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quit_ends_the_loop() {
        let (mut app, _outcomes) = app(Arc::new(StubSource::default()));
        assert_eq!(app.on_command(ConsoleCommand::Quit), Flow::Quit);
        assert_eq!(app.on_command(ConsoleCommand::FilterClear), Flow::Continue);
    }
}
