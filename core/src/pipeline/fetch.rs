use crate::ais_interface::{BoundsQuery, VesselState, Viewport};
use crate::pipeline::debounce::Debouncer;
use crate::pipeline::roster::Roster;
use crate::prelude::{FeedResult, FetchConfig, SnapshotSource};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Result of one bounds snapshot request, handed back to the roster owner.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Order in which the request was issued, starting at 1.
    pub seq: u64,
    pub query: BoundsQuery,
    pub result: FeedResult<Vec<VesselState>>,
}

impl FetchOutcome {
    /// Seeds `roster` on success and returns the vessel count. On failure
    /// the roster is left untouched and the error is returned for display.
    pub fn apply(self, roster: &mut Roster) -> FeedResult<usize> {
        let vessels = self.result?;
        let count = vessels.len();
        roster.seed(vessels);
        Ok(count)
    }
}

/// Turns viewport changes into debounced bounds snapshot requests.
pub struct FetchCoordinator {
    debouncer: Debouncer<BoundsQuery>,
    last_query: Option<BoundsQuery>,
}

impl FetchCoordinator {
    /// Returns the coordinator and the channel its outcomes arrive on.
    pub fn new<S: SnapshotSource>(
        source: Arc<S>,
        config: &FetchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FetchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let issued = Arc::new(AtomicU64::new(0));
        let debouncer = Debouncer::new(config.quiet_period(), move |query: BoundsQuery| {
            let source = Arc::clone(&source);
            let tx = tx.clone();
            let seq = issued.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                debug!(
                    "fetching snapshot #{} start={} end={}",
                    seq,
                    query.start_param(),
                    query.end_param()
                );
                let result = source.fetch(&query).await;
                if let Err(err) = &result {
                    warn!("bounds snapshot failed: {}", err);
                }
                let _ = tx.send(FetchOutcome { seq, query, result });
            }
        });

        (
            Self {
                debouncer,
                last_query: None,
            },
            rx,
        )
    }

    /// Schedules a fetch for `viewport` after the quiet period, superseding
    /// any fetch still waiting. Fetches already issued still report back.
    pub fn on_viewport_change(&mut self, viewport: &Viewport) {
        let query = BoundsQuery::from_viewport(viewport);
        self.last_query = Some(query);
        self.debouncer.call(query);
    }

    /// Fetches `viewport` immediately, superseding any fetch still waiting.
    pub fn fetch_now(&mut self, viewport: &Viewport) {
        let query = BoundsQuery::from_viewport(viewport);
        self.last_query = Some(query);
        self.debouncer.fire(query);
    }

    pub fn last_query(&self) -> Option<BoundsQuery> {
        self.last_query
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ais_interface::GeoPoint;
    use crate::prelude::FeedError;
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSource {
        queries: Mutex<Vec<BoundsQuery>>,
        fail: bool,
    }

    impl SnapshotSource for RecordingSource {
        fn fetch(
            &self,
            query: &BoundsQuery,
        ) -> impl Future<Output = FeedResult<Vec<VesselState>>> + Send {
            self.queries.lock().unwrap().push(*query);
            let fail = self.fail;
            async move {
                if fail {
                    Err(FeedError::Fetch("503 Service Unavailable".into()))
                } else {
                    Ok(vec![VesselState::new(1), VesselState::new(2)])
                }
            }
        }
    }

    fn viewport(offset: f64) -> Viewport {
        Viewport::new(
            GeoPoint::new(49.0 + offset, -6.0),
            GeoPoint::new(47.0 + offset, -3.0),
        )
    }

    fn config() -> FetchConfig {
        FetchConfig {
            quiet_period_ms: 400,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_viewport_changes_fetches_once_with_last_bounds() {
        let source = Arc::new(RecordingSource::default());
        let (mut coordinator, mut outcomes) = FetchCoordinator::new(Arc::clone(&source), &config());

        for step in 0..6 {
            coordinator.on_viewport_change(&viewport(step as f64));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let outcome = outcomes.recv().await.unwrap();

        let queries = source.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0], BoundsQuery::from_viewport(&viewport(5.0)));
        assert_eq!(outcome.query, queries[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn success_seeds_roster() {
        let source = Arc::new(RecordingSource::default());
        let (mut coordinator, mut outcomes) = FetchCoordinator::new(source, &config());
        let mut roster = Roster::new();
        roster.upsert(77, &Default::default());

        coordinator.fetch_now(&viewport(0.0));
        let outcome = outcomes.recv().await.unwrap();

        assert_eq!(outcome.apply(&mut roster).unwrap(), 2);
        assert!(roster.get(77).is_none());
        assert_eq!(roster.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_leaves_roster_untouched() {
        let source = Arc::new(RecordingSource {
            fail: true,
            ..Default::default()
        });
        let (mut coordinator, mut outcomes) = FetchCoordinator::new(source, &config());
        let mut roster = Roster::new();
        roster.upsert(77, &Default::default());

        coordinator.on_viewport_change(&viewport(0.0));
        let outcome = outcomes.recv().await.unwrap();

        assert!(matches!(outcome.apply(&mut roster), Err(FeedError::Fetch(_))));
        assert_eq!(roster.len(), 1);
        assert!(roster.get(77).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_fetch() {
        let source = Arc::new(RecordingSource::default());
        let (mut coordinator, _outcomes) = FetchCoordinator::new(Arc::clone(&source), &config());

        coordinator.on_viewport_change(&viewport(0.0));
        assert!(coordinator.is_pending());
        coordinator.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(source.queries.lock().unwrap().is_empty());
        assert_eq!(
            coordinator.last_query(),
            Some(BoundsQuery::from_viewport(&viewport(0.0)))
        );
    }

    struct SlowSource {
        delay: Duration,
    }

    impl SnapshotSource for SlowSource {
        fn fetch(
            &self,
            query: &BoundsQuery,
        ) -> impl Future<Output = FeedResult<Vec<VesselState>>> + Send {
            let delay = self.delay;
            let mmsi = query.min_lat as u64;
            async move {
                tokio::time::sleep(delay).await;
                Ok(vec![VesselState::new(mmsi)])
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn issued_fetches_report_back_while_panning() {
        let source = Arc::new(SlowSource {
            delay: Duration::from_millis(600),
        });
        let (mut coordinator, mut outcomes) = FetchCoordinator::new(source, &config());

        for step in 0..5 {
            coordinator.on_viewport_change(&viewport(step as f64));
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;

        let mut seqs = Vec::new();
        while let Ok(outcome) = outcomes.try_recv() {
            assert!(outcome.result.is_ok());
            seqs.push(outcome.seq);
        }
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }
}
