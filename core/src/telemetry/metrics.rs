use std::sync::Mutex;

/// Per-feed counters shared between a connection driver and its owner.
pub struct FeedMetrics {
    inner: Mutex<Counters>,
}

/// Point-in-time copy of the feed counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub delivered: usize,
    pub malformed: usize,
    pub reconnects: usize,
    pub health_checks: usize,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
        }
    }

    pub fn record_delivered(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.delivered += 1;
        }
    }

    pub fn record_malformed(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.malformed += 1;
        }
    }

    pub fn record_reconnect(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.reconnects += 1;
        }
    }

    pub fn record_health_check(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.health_checks += 1;
        }
    }

    pub fn snapshot(&self) -> Counters {
        if let Ok(counters) = self.inner.lock() {
            *counters
        } else {
            Counters::default()
        }
    }
}

impl Default for FeedMetrics {
    fn default() -> Self {
        Self::new()
    }
}
