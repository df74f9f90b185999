use crate::prelude::{ConnectionConfig, HealthProbe, Subscription, Transport, TransportEvent};
use crate::telemetry::{FeedMetrics, LogManager};
use crate::transport::lifecycle::{ConnectionEvent, ConnectionState, Transition};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owned handle to one logical feed subscription.
///
/// The handle is the only owner of the driver task and, through it, of the
/// socket. Dropping it cancels the driver; `disconnect` additionally waits
/// for the subscription to be closed.
pub struct ConnectionHandle {
    topic: String,
    state: watch::Receiver<ConnectionState>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
    metrics: Arc<FeedMetrics>,
    logger: LogManager,
}

impl ConnectionHandle {
    /// Opens a subscription to `topic` and keeps it alive until
    /// `disconnect`. Every inbound body is parsed into `M` before
    /// `on_message` sees it; bodies that do not parse are logged and dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect<T, P, M, F>(
        transport: Arc<T>,
        probe: Arc<P>,
        topic: impl Into<String>,
        config: &ConnectionConfig,
        on_message: F,
    ) -> Self
    where
        T: Transport,
        P: HealthProbe,
        M: DeserializeOwned + Send + 'static,
        F: FnMut(M) + Send + 'static,
    {
        let topic = topic.into();
        let logger = LogManager::new(topic.clone());
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let state_tx = Arc::new(state_tx);
        let cancel = CancellationToken::new();
        let metrics = Arc::new(FeedMetrics::new());

        advance(&state_tx, ConnectionEvent::Open, &logger);

        let driver = Driver {
            transport,
            probe,
            topic: topic.clone(),
            retry_interval: config.retry_interval(),
            state: Arc::clone(&state_tx),
            cancel: cancel.clone(),
            metrics: Arc::clone(&metrics),
            logger: logger.clone(),
        };
        let task = tokio::spawn(driver.run(on_message));

        Self {
            topic,
            state,
            state_tx,
            cancel,
            driver: Some(task),
            metrics,
            logger,
        }
    }

    /// Deactivates the subscription and releases the socket. Calling it on
    /// an already disconnected handle does nothing.
    pub async fn disconnect(&mut self) {
        let Some(task) = self.driver.take() else {
            return;
        };
        self.cancel.cancel();
        if let Err(err) = task.await {
            if !err.is_cancelled() {
                self.logger.warn(&format!("driver task ended abnormally: {}", err));
            }
        }
        advance(&self.state_tx, ConnectionEvent::Shutdown, &self.logger);
        self.logger.record("disconnected");
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change of this handle.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn metrics(&self) -> Arc<FeedMetrics> {
        Arc::clone(&self.metrics)
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn advance(
    state: &watch::Sender<ConnectionState>,
    event: ConnectionEvent,
    logger: &LogManager,
) -> Transition {
    let current = *state.borrow();
    let transition = current.on(event);
    match transition {
        Transition::Enter(next) => {
            state.send_replace(next);
            logger.trace_payload(&format!("{} -> {} on {:?}", current, next, event));
        }
        Transition::Stay => {}
        Transition::Illegal => {
            logger.warn(&format!("ignoring {:?} while {}", event, current));
        }
    }
    transition
}

enum SessionEnd {
    /// The socket went away after the subscription had been active.
    Dropped,
    /// The connect attempt itself failed.
    Refused,
    Cancelled,
}

struct Driver<T, P> {
    transport: Arc<T>,
    probe: Arc<P>,
    topic: String,
    retry_interval: Duration,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    metrics: Arc<FeedMetrics>,
    logger: LogManager,
}

impl<T: Transport, P: HealthProbe> Driver<T, P> {
    async fn run<M, F>(self, mut on_message: F)
    where
        M: DeserializeOwned + Send + 'static,
        F: FnMut(M) + Send + 'static,
    {
        loop {
            let end = self.session(&mut on_message).await;
            let probe_immediately = match end {
                SessionEnd::Cancelled => return,
                SessionEnd::Dropped => true,
                // A backend that answers health checks but refuses the socket
                // must not be retried in a tight loop.
                SessionEnd::Refused => false,
            };

            match advance(&self.state, ConnectionEvent::TransportClosed, &self.logger) {
                Transition::Enter(ConnectionState::Reconnecting) => {}
                _ => continue,
            }
            self.metrics.record_reconnect();

            if !self.await_backend(probe_immediately).await {
                return;
            }
            advance(&self.state, ConnectionEvent::BackendHealthy, &self.logger);
        }
    }

    async fn session<M, F>(&self, on_message: &mut F) -> SessionEnd
    where
        M: DeserializeOwned,
        F: FnMut(M),
    {
        let opened = tokio::select! {
            _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
            opened = self.transport.subscribe(&self.topic) => opened,
        };

        let mut subscription = match opened {
            Ok(subscription) => subscription,
            Err(err) => {
                self.logger.warn(&format!("connect failed: {}", err));
                return SessionEnd::Refused;
            }
        };

        advance(&self.state, ConnectionEvent::Established, &self.logger);
        self.logger.record("subscription active");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    subscription.close().await;
                    return SessionEnd::Cancelled;
                }
                event = subscription.next_event() => match event {
                    TransportEvent::Message(body) => self.deliver(&body, on_message),
                    TransportEvent::Closed(reason) => {
                        self.logger.warn(&format!(
                            "socket closed ({}), reconnecting",
                            reason.as_deref().unwrap_or("no reason")
                        ));
                        return SessionEnd::Dropped;
                    }
                },
            }
        }
    }

    fn deliver<M, F>(&self, body: &str, on_message: &mut F)
    where
        M: DeserializeOwned,
        F: FnMut(M),
    {
        match serde_json::from_str::<M>(body) {
            Ok(message) => {
                self.metrics.record_delivered();
                on_message(message);
            }
            Err(err) => {
                self.metrics.record_malformed();
                self.logger
                    .warn(&format!("dropping malformed payload ({}): {}", err, body));
            }
        }
    }

    /// Polls the health probe on a fixed interval until it reports healthy.
    /// Returns `false` when cancelled first.
    async fn await_backend(&self, probe_immediately: bool) -> bool {
        let mut wait_first = !probe_immediately;
        loop {
            if wait_first {
                tokio::select! {
                    _ = self.cancel.cancelled() => return false,
                    _ = tokio::time::sleep(self.retry_interval) => {}
                }
            }
            wait_first = true;

            self.metrics.record_health_check();
            let healthy = tokio::select! {
                _ = self.cancel.cancelled() => return false,
                healthy = self.probe.is_healthy() => healthy,
            };
            if healthy {
                self.logger.record("backend is up again, reconnecting");
                return true;
            }
            self.logger.trace_payload("waiting for backend");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{FeedError, FeedResult};
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    struct ScriptedSubscription {
        events: mpsc::UnboundedReceiver<TransportEvent>,
        closed: Arc<AtomicUsize>,
    }

    impl Subscription for ScriptedSubscription {
        fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send {
            async move {
                match self.events.recv().await {
                    Some(event) => event,
                    None => std::future::pending().await,
                }
            }
        }

        fn close(self) -> impl Future<Output = ()> + Send {
            self.closed.fetch_add(1, Ordering::SeqCst);
            async {}
        }
    }

    /// Hands out pre-scripted sessions; `None` entries refuse the connect.
    #[derive(Default)]
    struct ScriptedTransport {
        sessions: Mutex<VecDeque<Option<mpsc::UnboundedReceiver<TransportEvent>>>>,
        attempts: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn session(&self) -> mpsc::UnboundedSender<TransportEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.sessions.lock().unwrap().push_back(Some(rx));
            tx
        }

        fn refuse(&self) {
            self.sessions.lock().unwrap().push_back(None);
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        type Subscription = ScriptedSubscription;

        fn subscribe(
            &self,
            _topic: &str,
        ) -> impl Future<Output = FeedResult<ScriptedSubscription>> + Send {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let next = self.sessions.lock().unwrap().pop_front().flatten();
            let closed = Arc::clone(&self.closed);
            async move {
                next.map(|events| ScriptedSubscription { events, closed })
                    .ok_or_else(|| FeedError::Transport("connection refused".into()))
            }
        }
    }

    /// Answers health checks from a script, then keeps answering `fallback`.
    struct ScriptedProbe {
        answers: Mutex<VecDeque<bool>>,
        fallback: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(answers: &[bool], fallback: bool) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HealthProbe for ScriptedProbe {
        fn is_healthy(&self) -> impl Future<Output = bool> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self.answers.lock().unwrap().pop_front().unwrap_or(self.fallback);
            async move { answer }
        }
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            retry_interval_ms: 3_000,
        }
    }

    async fn wait_for(handle: &ConnectionHandle, wanted: ConnectionState) {
        let mut rx = handle.watch_state();
        rx.wait_for(|state| *state == wanted).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_parsed_messages_in_order() {
        let transport = Arc::new(ScriptedTransport::default());
        let feed = transport.session();
        let probe = Arc::new(ScriptedProbe::new(&[], true));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handle = ConnectionHandle::connect(
            Arc::clone(&transport),
            probe,
            "ais-data",
            &config(),
            move |ping: Ping| {
                let _ = tx.send(ping);
            },
        );
        wait_for(&handle, ConnectionState::Connected).await;

        feed.send(TransportEvent::Message(r#"{"n":1}"#.into())).unwrap();
        feed.send(TransportEvent::Message(r#"{"n":2}"#.into())).unwrap();
        assert_eq!(rx.recv().await, Some(Ping { n: 1 }));
        assert_eq!(rx.recv().await, Some(Ping { n: 2 }));
        assert_eq!(handle.metrics().snapshot().delivered, 2);

        handle.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_dropped_without_closing() {
        let transport = Arc::new(ScriptedTransport::default());
        let feed = transport.session();
        let probe = Arc::new(ScriptedProbe::new(&[], true));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handle = ConnectionHandle::connect(
            Arc::clone(&transport),
            probe,
            "ais-data",
            &config(),
            move |ping: Ping| {
                let _ = tx.send(ping);
            },
        );
        wait_for(&handle, ConnectionState::Connected).await;

        feed.send(TransportEvent::Message("not json".into())).unwrap();
        feed.send(TransportEvent::Message(r#"{"unexpected":true}"#.into()))
            .unwrap();
        feed.send(TransportEvent::Message(r#"{"n":3}"#.into())).unwrap();

        assert_eq!(rx.recv().await, Some(Ping { n: 3 }));
        assert_eq!(handle.state(), ConnectionState::Connected);
        let counters = handle.metrics().snapshot();
        assert_eq!(counters.malformed, 2);
        assert_eq!(counters.delivered, 1);
        assert_eq!(transport.attempts(), 1);

        handle.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_close_events_start_a_single_reconnect() {
        let transport = Arc::new(ScriptedTransport::default());
        let first = transport.session();
        let _second = transport.session();
        let probe = Arc::new(ScriptedProbe::new(&[false, false, true], false));

        let mut handle = ConnectionHandle::connect(
            Arc::clone(&transport),
            Arc::clone(&probe),
            "violations/7",
            &config(),
            |_: Ping| {},
        );
        wait_for(&handle, ConnectionState::Connected).await;

        first.send(TransportEvent::Closed(Some("reset".into()))).unwrap();
        first.send(TransportEvent::Closed(None)).unwrap();
        wait_for(&handle, ConnectionState::Reconnecting).await;
        wait_for(&handle, ConnectionState::Connected).await;

        assert_eq!(probe.calls(), 3);
        assert_eq!(transport.attempts(), 2);
        let counters = handle.metrics().snapshot();
        assert_eq!(counters.reconnects, 1);
        assert_eq!(counters.health_checks, 3);

        handle.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn health_checks_run_on_fixed_interval() {
        let transport = Arc::new(ScriptedTransport::default());
        let first = transport.session();
        let _second = transport.session();
        let probe = Arc::new(ScriptedProbe::new(&[false, false, true], false));

        let mut handle = ConnectionHandle::connect(
            Arc::clone(&transport),
            Arc::clone(&probe),
            "ais-data",
            &config(),
            |_: Ping| {},
        );
        wait_for(&handle, ConnectionState::Connected).await;

        let started = tokio::time::Instant::now();
        first.send(TransportEvent::Closed(None)).unwrap();
        wait_for(&handle, ConnectionState::Reconnecting).await;
        wait_for(&handle, ConnectionState::Connected).await;

        // Immediate probe, then two waits of one interval each.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(6_000));
        assert!(elapsed < Duration::from_millis(6_100));
        handle.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connect_waits_before_probing() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.refuse();
        let _session = transport.session();
        let probe = Arc::new(ScriptedProbe::new(&[], true));

        let started = tokio::time::Instant::now();
        let mut handle = ConnectionHandle::connect(
            Arc::clone(&transport),
            Arc::clone(&probe),
            "ais-data",
            &config(),
            |_: Ping| {},
        );
        wait_for(&handle, ConnectionState::Reconnecting).await;
        wait_for(&handle, ConnectionState::Connected).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3_000));
        assert!(elapsed < Duration::from_millis(3_100));
        assert_eq!(probe.calls(), 1);
        assert_eq!(transport.attempts(), 2);
        handle.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_reconnect_poll() {
        let transport = Arc::new(ScriptedTransport::default());
        let first = transport.session();
        let probe = Arc::new(ScriptedProbe::new(&[], false));

        let mut handle = ConnectionHandle::connect(
            Arc::clone(&transport),
            Arc::clone(&probe),
            "ais-data",
            &config(),
            |_: Ping| {},
        );
        wait_for(&handle, ConnectionState::Connected).await;
        first.send(TransportEvent::Closed(None)).unwrap();
        wait_for(&handle, ConnectionState::Reconnecting).await;

        handle.disconnect().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        let calls = probe.calls();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(probe.calls(), calls);
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_closes_subscription_and_is_idempotent() {
        let transport = Arc::new(ScriptedTransport::default());
        let _feed = transport.session();
        let probe = Arc::new(ScriptedProbe::new(&[], true));

        let mut handle = ConnectionHandle::connect(
            Arc::clone(&transport),
            probe,
            "ais-data",
            &config(),
            |_: Ping| {},
        );
        wait_for(&handle, ConnectionState::Connected).await;

        handle.disconnect().await;
        handle.disconnect().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);
    }
}
