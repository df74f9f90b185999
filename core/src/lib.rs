//! Live-feed core for the SeaX maritime dashboard.
//!
//! Keeps a roster of vessel states current from a bounds snapshot plus an
//! incremental position stream, buffers zone/collision notifications without
//! duplicates, and owns the reconnecting feed subscriptions behind both.

pub mod ais_interface;
pub mod classify;
pub mod pipeline;
pub mod prelude;
pub mod telemetry;
pub mod transport;

pub use prelude::{FeedError, FeedResult, HealthProbe, SnapshotSource, Subscription, Transport};
