mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/{id}", get(users::get_user).patch(users::update_user))
        .route(
            "/users/{id}/tokens",
            post(users::create_user_token).get(users::list_user_tokens),
        )
}
