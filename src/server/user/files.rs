use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::auth::RequireUser;
use crate::files::{FileSelector, UpdateOutcome, UploadRequest};
use crate::server::AppState;
use crate::server::download::{Disposition, stream_file};
use crate::server::dto::{ListFilesParams, PublishFileRequest, PublishFileResponse, UpdateFileRequest};
use crate::server::response::{ApiError, ApiResponse};

pub async fn upload_file(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> impl IntoResponse {
    let file = state.files.upload(&auth.user, req).await?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(file))))
}

pub async fn list_files(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListFilesParams>,
) -> impl IntoResponse {
    let files = state.files.list(&auth.user, &params.into())?;

    Ok::<_, ApiError>(Json(ApiResponse::success(files)))
}

pub async fn get_file(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(selector): Json<FileSelector>,
) -> impl IntoResponse {
    let (file, reader) = state.files.get(&auth.user, &selector).await?;

    Ok::<_, ApiError>(stream_file(&file, reader, Disposition::Attachment))
}

pub async fn update_file(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateFileRequest>,
) -> impl IntoResponse {
    match state.files.update(&auth.user, &req.selector, &req.update)? {
        UpdateOutcome::Updated => {
            Ok::<_, ApiError>(Json(ApiResponse::success(json!({ "updated": true }))))
        }
        UpdateOutcome::NothingToDo => Err(ApiError::conflict("nothing to do")),
    }
}

pub async fn publish_file(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishFileRequest>,
) -> impl IntoResponse {
    let public_name = state
        .files
        .publish(&auth.user, &req.selector, req.public_name.as_deref())?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PublishFileResponse {
        public_name,
    })))
}

pub async fn delete_file(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(selector): Json<FileSelector>,
) -> impl IntoResponse {
    state.files.delete(&auth.user, &selector).await?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
