pub mod context;
pub mod layout;
pub mod overlays;
