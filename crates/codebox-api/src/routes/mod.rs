//! HTTP routes.
//!
//! - `GET /` — health check
//! - `{prefix}/*` — smoke-test router
//! - anything else — `404 {"detail": "Not Found"}`

pub mod health;

use axum::Router;
use axum::routing::get;
use codebox_core::ServiceHandle;

use crate::error::ApiError;

pub use health::HealthResponse;

/// State shared with handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// HTTP server lifecycle.
    pub http: ServiceHandle,
    /// Debug listener lifecycle.
    pub debug: ServiceHandle,
}

/// Build the route table with the smoke-test router nested at `smoke_test_prefix`.
///
/// Both `{prefix}` and `{prefix}/` answer the smoke-test status route.
pub fn router(smoke_test_prefix: &str, state: AppState) -> Router {
    Router::new()
        .route("/", get(health::health))
        .route(&format!("{smoke_test_prefix}/"), get(smoke_test::status))
        .nest(smoke_test_prefix, smoke_test::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}
