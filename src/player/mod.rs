pub mod identity;
pub mod models;
pub mod registry;

pub use identity::{normalize, PlayerKey};
pub use models::{PlayerRecord, PlayerRegistry};
pub use registry::Registration;
