//! Error types for codebox-api

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Result type alias for codebox-api operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running the application
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from codebox-core
    #[error("Core error: {0}")]
    Core(#[from] codebox_core::Error),

    /// A listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    /// A CORS policy entry is not a valid origin, method, or header.
    #[error("Invalid CORS policy: {0}")]
    InvalidCors(String),

    /// The debug listener failed.
    #[error("Debug listener error: {0}")]
    Debug(#[source] std::io::Error),
}

/// Error returned from a request handler.
///
/// Rendered as `{"detail": "..."}` with the matching status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Build an error with an explicit status.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// `404 Not Found`.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    /// `422 Unprocessable Entity` for a body that could not be decoded.
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    /// HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Human-readable message.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
