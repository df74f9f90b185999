pub mod bounds;
pub mod position;
pub mod stomp;
pub mod violation;

pub use bounds::{BoundsQuery, Viewport};
pub use position::{GeoPoint, PositionRecord, VesselPatch, VesselState};
pub use stomp::{Command, Frame};
pub use violation::{ViolationEvent, ViolationKind, ZoneConstraints, ZoneVessel};
