use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type Action<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Trailing-edge debounce: only the last value of a burst runs the action,
/// once the quiet period has elapsed without a newer call.
///
/// A newer call only replaces a value that is still waiting. Once the quiet
/// period is over the action runs to completion unless `cancel` is called
/// or the debouncer is dropped.
pub struct Debouncer<T> {
    quiet: Duration,
    action: Action<T>,
    waiting: Option<JoinHandle<()>>,
    running: Arc<AtomicUsize>,
    teardown: CancellationToken,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F, Fut>(quiet: Duration, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            quiet,
            action: Arc::new(move |value| action(value).boxed()),
            waiting: None,
            running: Arc::new(AtomicUsize::new(0)),
            teardown: CancellationToken::new(),
        }
    }

    /// Schedules `value`, replacing whatever is still waiting.
    pub fn call(&mut self, value: T) {
        self.schedule(value, self.quiet);
    }

    /// Runs `value` right away, replacing whatever is still waiting.
    pub fn fire(&mut self, value: T) {
        self.schedule(value, Duration::ZERO);
    }

    /// Drops the waiting value and stops every run already in progress.
    pub fn cancel(&mut self) {
        self.drop_waiting();
        self.teardown.cancel();
        self.teardown = CancellationToken::new();
    }

    /// True while a value waits out its quiet period or an action is running.
    pub fn is_pending(&self) -> bool {
        self.waiting
            .as_ref()
            .is_some_and(|waiting| !waiting.is_finished())
            || self.running.load(Ordering::SeqCst) > 0
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    fn drop_waiting(&mut self) {
        if let Some(waiting) = self.waiting.take() {
            waiting.abort();
        }
    }

    fn schedule(&mut self, value: T, delay: Duration) {
        self.drop_waiting();
        let action = Arc::clone(&self.action);
        let running = Arc::clone(&self.running);
        let teardown = self.teardown.clone();
        self.waiting = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            // No await between here and the spawn, so an abort cannot split them.
            running.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                tokio::select! {
                    _ = teardown.cancelled() => {}
                    _ = action(value) => {}
                }
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }));
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(waiting) = self.waiting.take() {
            waiting.abort();
        }
        self.teardown.cancel();
    }
}
