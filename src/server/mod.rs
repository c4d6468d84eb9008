mod admin;
mod download;
pub mod dto;
mod public;
pub mod response;
mod router;
mod user;

pub use router::{AppState, create_router};
