use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::files::labels::list_labels;
use crate::server::AppState;
use crate::server::dto::{LabelResponse, NamespaceParams};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{LabelKind, User};

fn labels_response(
    state: &AppState,
    user: &User,
    kind: LabelKind,
    namespace: &str,
) -> Result<Json<ApiResponse<Vec<LabelResponse>>>, ApiError> {
    let labels = list_labels(state.store.as_ref(), user, kind, namespace)?;
    let responses = labels.into_iter().map(LabelResponse::from).collect();
    Ok(Json(ApiResponse::success(responses)))
}

pub async fn list_tags(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<NamespaceParams>,
) -> impl IntoResponse {
    labels_response(&state, &auth.user, LabelKind::Tag, &params.namespace)
}

pub async fn list_groups(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<NamespaceParams>,
) -> impl IntoResponse {
    labels_response(&state, &auth.user, LabelKind::Group, &params.namespace)
}
