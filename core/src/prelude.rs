use crate::ais_interface::{BoundsQuery, VesselState};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Tunables for a single feed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub retry_interval_ms: u64,
}

impl ConnectionConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 3_000,
        }
    }
}

/// Tunables for the bounds-driven snapshot fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub quiet_period_ms: u64,
}

impl FetchConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 400,
        }
    }
}

/// Common error type for feed, codec and fetch failures.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("snapshot fetch failed: {0}")]
    Fetch(String),
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
}

pub type FeedResult<T> = Result<T, FeedError>;

/// What a live subscription yields to the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Raw message body, not yet parsed.
    Message(String),
    /// The underlying socket went away, with an optional reason.
    Closed(Option<String>),
}

/// Opens subscriptions on a streaming endpoint. Every call yields a fresh
/// socket; the connection manager never reuses one across reconnects.
pub trait Transport: Send + Sync + 'static {
    type Subscription: Subscription;

    fn subscribe(
        &self,
        topic: &str,
    ) -> impl Future<Output = FeedResult<Self::Subscription>> + Send;
}

/// An active subscription that exclusively owns its socket.
pub trait Subscription: Send + 'static {
    /// Must be cancel-safe: dropping the future loses no message.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send;

    /// Deactivates the subscription and releases the socket.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Liveness probe gating reconnect attempts.
pub trait HealthProbe: Send + Sync + 'static {
    fn is_healthy(&self) -> impl Future<Output = bool> + Send;
}

/// Returns every vessel inside a rectangular region.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(
        &self,
        query: &BoundsQuery,
    ) -> impl Future<Output = FeedResult<Vec<VesselState>>> + Send;
}
