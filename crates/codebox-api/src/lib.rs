//! # codebox-api
//!
//! HTTP application for codebox.
//!
//! This crate provides:
//! - the route table (`GET /` health check, smoke-test router, JSON 404)
//! - CORS and request-tracing middleware
//! - the server that binds and serves it with graceful shutdown
//! - the remote-debug attach listener
//!
//! ```rust,ignore
//! use codebox_api::Server;
//! use codebox_core::{CodeboxConfig, Shutdown};
//!
//! let bound = Server::new(CodeboxConfig::default())?.bind().await?;
//! bound.run(Shutdown::new()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod debug;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Error, Result};
pub use routes::{AppState, HealthResponse};
pub use server::{BoundServer, Server};
