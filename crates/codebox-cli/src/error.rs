//! Error types for codebox-cli

use thiserror::Error;

/// Result type alias for codebox-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in codebox-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from codebox-core
    #[error("Core error: {0}")]
    Core(#[from] codebox_core::Error),

    /// Error from codebox-api
    #[error("API error: {0}")]
    Api(#[from] codebox_api::Error),
}
