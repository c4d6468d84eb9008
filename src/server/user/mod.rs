mod files;
mod labels;
mod namespaces;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Files
        .route("/files", post(files::upload_file))
        .route("/files", get(files::list_files))
        .route("/file/get", post(files::get_file))
        .route("/file/update", post(files::update_file))
        .route("/file/publish", post(files::publish_file))
        .route("/file/delete", post(files::delete_file))
        // Namespaces
        .route("/namespaces", get(namespaces::list_namespaces))
        .route("/namespaces", post(namespaces::create_namespace))
        // Tags and groups
        .route("/tags", get(labels::list_tags))
        .route("/groups", get(labels::list_groups))
}
