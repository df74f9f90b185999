pub mod nav_status;
pub mod ship_type;

pub use nav_status::GeneralStatus;
pub use ship_type::ShipCategory;
