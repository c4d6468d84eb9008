use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::auth::{RequireAdmin, TokenOwner, issue_token};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, TokenResponse,
    UpdateUserRequest, UserResponse,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::store::Store;
use crate::types::{Capabilities, User};
use crate::validation::validate_username;

fn parse_capabilities(names: &[String]) -> Result<Capabilities, ApiError> {
    Capabilities::parse_many(names)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid capability in {names:?}")))
}

fn find_user(store: &dyn Store, id: i64) -> Result<User, ApiError> {
    store
        .get_user(id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")
}

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    validate_username(&req.username)?;

    let capabilities = match &req.capabilities {
        Some(names) => parse_capabilities(names)?,
        None => Capabilities::default_user(),
    };

    let now = Utc::now();
    let mut user = User {
        id: 0,
        username: req.username,
        capabilities,
        created_at: now,
        updated_at: now,
    };

    user.id = match state.store.create_user(&user) {
        Ok(id) => id,
        Err(Error::AlreadyExists) => return Err(ApiError::conflict("User already exists")),
        Err(e) => return Err(ApiError::from(e)),
    };

    tracing::info!("Created user {} ({})", user.username, user.capabilities);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(UserResponse::from(user)))))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users = state.store.list_users().api_err("Failed to list users")?;
    let responses: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(responses)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let user = find_user(state.store.as_ref(), id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(UserResponse::from(user))))
}

pub async fn update_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = find_user(store, id)?;
    let capabilities = parse_capabilities(&req.capabilities)?;

    store
        .update_user_capabilities(user.id, capabilities)
        .api_err("Failed to update user")?;

    let user = find_user(store, id)?;
    tracing::info!("Set capabilities of {} to {}", user.username, user.capabilities);

    Ok::<_, ApiError>(Json(ApiResponse::success(UserResponse::from(user))))
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = find_user(store, id)?;

    let tokens = store
        .list_user_tokens(user.id)
        .api_err("Failed to list user tokens")?;
    let responses: Vec<TokenResponse> = tokens.into_iter().map(TokenResponse::from).collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(responses)))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let user = find_user(store, id)?;

    if req.expires_in_seconds.is_some_and(|s| s < 0) {
        return Err(ApiError::bad_request(
            "expires_in_seconds cannot be negative",
        ));
    }
    let expires_at = req
        .expires_in_seconds
        .map(|s| Utc::now() + Duration::seconds(s));

    let (raw_token, token) = issue_token(store, TokenOwner::User(user.id), expires_at)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: TokenResponse::from(token),
        })),
    ))
}
