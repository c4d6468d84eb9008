mod helpers;
mod middleware;
mod token;

pub use middleware::{AuthError, RequireAdmin, RequireUser};
pub use token::{TokenGenerator, TokenOwner, issue_token, parse_token};
