//! Codebox Core — configuration, errors, lifecycle, and the devcontainer descriptor.
//!
//! This crate has no internal codebox dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`config`]: TOML + environment configuration
//! - [`service`]: Service lifecycle state and shutdown signalling
//! - [`devcontainer`]: `devcontainer.json` model and validation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod config;
pub mod devcontainer;
pub mod error;
pub mod service;

pub use config::{
    CodeboxConfig, CorsPolicy, DebugConfig, LogFormat, LoggingConfig, ServerConfig,
};
pub use devcontainer::DevContainer;
pub use error::{Error, Result};
pub use service::{ServiceHandle, ServiceState, Shutdown, ShutdownSignal};
