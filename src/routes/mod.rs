pub mod admin;
pub mod public;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::Uri;
use axum::routing::any;
use axum::Router;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
}

/// Builds the full application router. The admin API dispatches on the final
/// path segment under `/api/admin`; the public API is one route dispatching
/// on its `action` query parameter.
pub fn app(config: AppConfig, pool: SqlitePool) -> Router {
    let body_limit = config.max_upload_size + 64 * 1024;
    let state = AppState {
        pool,
        config: Arc::new(config),
    };

    Router::new()
        .nest("/api/admin", admin::router())
        .route("/api/public", any(public::dispatch))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    let endpoint = uri.path().rsplit('/').next().unwrap_or_default();
    ApiError::NotFound(format!("Endpoint not found: {}", endpoint))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Admin request bodies are parsed leniently: an unreadable JSON body is
/// treated as an empty object, and missing-field validation does the rest.
pub(crate) fn lenient_json<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    if body.is_empty() {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_default()
}
