//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_folder, delete_file, file_metadata, health_check, list_files, not_found, upload_file,
    AppState,
};
use super::middleware::{api_rate_limit, create_cors_layer, upload_rate_limit, RateLimitState};

/// Room for multipart framing and text fields on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Create the `/api/drive` router.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limit_state: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = usize::try_from(app_state.max_file_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    // Upload route: its own rate ceiling and body limit
    let upload_limiter = rate_limit_state.clone();
    let upload_routes = Router::new()
        .route("/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(move |req, next| {
            upload_rate_limit(upload_limiter.clone(), req, next)
        }));

    let drive_routes = Router::new()
        .route("/create-folder", post(create_folder))
        .route("/files/:project_id", get(list_files))
        .route("/file/:file_id", delete(delete_file))
        .route("/file/:file_id/metadata", get(file_metadata))
        .merge(upload_routes);

    let api_limiter = rate_limit_state;

    Router::new()
        .nest("/api/drive", drive_routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    api_rate_limit(api_limiter.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}
