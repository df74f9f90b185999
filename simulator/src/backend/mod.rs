pub mod bridge;
pub mod broker;
pub mod model;
