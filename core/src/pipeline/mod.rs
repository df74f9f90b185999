pub mod debounce;
pub mod fetch;
pub mod filter;
pub mod notifications;
pub mod roster;

pub use debounce::Debouncer;
pub use fetch::{FetchCoordinator, FetchOutcome};
pub use filter::RosterFilter;
pub use notifications::NotificationBuffer;
pub use roster::Roster;
