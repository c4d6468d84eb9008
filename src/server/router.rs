use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tower::ServiceBuilder;

use super::admin::admin_router;
use super::public::public_router;
use super::user::user_router;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::fetch::RemoteFetcher;
use crate::files::FileService;
use crate::storage::BlobStorage;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub files: FileService,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &ServerConfig) -> Result<Self> {
        let fetcher = RemoteFetcher::new(config.fetch_timeout())?;
        let storage = BlobStorage::new(&config.data_dir);
        let files = FileService::new(store.clone(), storage, fetcher);
        Ok(Self {
            store,
            files,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", user_router())
        .nest("/p", public_router())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
