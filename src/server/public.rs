use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use super::download::{Disposition, stream_file};
use super::response::{ApiError, ApiResponse};
use crate::server::AppState;

/// Unauthenticated access to shared files by public alias.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{alias}", get(download))
        .route("/{alias}/info", get(info))
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> impl IntoResponse {
    let (file, reader) = state.files.open_public(&alias).await?;

    Ok::<_, ApiError>(stream_file(&file, reader, Disposition::Inline))
}

async fn info(State(state): State<Arc<AppState>>, Path(alias): Path<String>) -> impl IntoResponse {
    let info = state.files.public_info(&alias)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(info)))
}
