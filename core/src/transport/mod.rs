pub mod connection;
pub mod lifecycle;

pub use connection::ConnectionHandle;
pub use lifecycle::{ConnectionEvent, ConnectionState, Transition};
