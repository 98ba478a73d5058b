//! Error types for codebox-core

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for codebox-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in codebox-core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Filesystem error tied to a specific path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path that was being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid or unresolvable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Devcontainer descriptor failed validation.
    #[error("Devcontainer error: {0}")]
    Devcontainer(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse failure.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML render failure.
    #[error("TOML render error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Build a [`Error::Config`] from any message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`Error::Devcontainer`] from any message.
    pub fn devcontainer(msg: impl Into<String>) -> Self {
        Self::Devcontainer(msg.into())
    }

    /// Attach a path to an I/O error.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
