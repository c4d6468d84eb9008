use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::files::namespace::{self, default_namespace};
use crate::server::AppState;
use crate::server::dto::{CreateNamespaceRequest, NamespaceResponse};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_namespaces(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let default_name = default_namespace(&auth.user).name;
    let namespaces = namespace::list_namespaces(state.store.as_ref(), &auth.user)?;

    let responses: Vec<NamespaceResponse> = namespaces
        .into_iter()
        .map(|ns| NamespaceResponse {
            is_default: ns.name == default_name,
            namespace: ns,
        })
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(responses)))
}

pub async fn create_namespace(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamespaceRequest>,
) -> impl IntoResponse {
    let ns = namespace::create_namespace(state.store.as_ref(), &auth.user, &req.name)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(NamespaceResponse {
            namespace: ns,
            is_default: false,
        })),
    ))
}
