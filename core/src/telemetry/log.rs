use log::{debug, info, warn};

/// Feed-scoped logger; every line carries the feed name.
#[derive(Debug, Clone)]
pub struct LogManager {
    feed: String,
}

impl LogManager {
    pub fn new(feed: impl Into<String>) -> Self {
        Self { feed: feed.into() }
    }

    pub fn feed(&self) -> &str {
        &self.feed
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.feed, message);
    }

    pub fn trace_payload(&self, message: &str) {
        debug!("[{}] {}", self.feed, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.feed, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("feed")
    }
}
