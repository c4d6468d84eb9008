mod capability;
mod models;

pub use capability::Capabilities;
pub use models::*;
