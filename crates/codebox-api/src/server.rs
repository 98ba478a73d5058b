//! Application server.
//!
//! [`Server`] turns a [`CodeboxConfig`] into a router. [`Server::bind`]
//! opens the debug listener first (so a debugger can attach before any
//! request is served) and then the HTTP listener. [`BoundServer::run`]
//! serves until the shared [`Shutdown`] fires.

use std::net::SocketAddr;

use axum::Router;
use codebox_core::{CodeboxConfig, ServiceHandle, ServiceState, Shutdown};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{info, warn};

use crate::debug::{AttachWatcher, DebugListener};
use crate::error::{Error, Result};
use crate::middleware::{cors_layer, trace_layer};
use crate::routes::{self, AppState};

/// Codebox HTTP server.
pub struct Server {
    config: CodeboxConfig,
    state: AppState,
}

impl Server {
    /// Create a server for `config`.
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: CodeboxConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: AppState {
                http: ServiceHandle::new("http"),
                debug: ServiceHandle::new("debug"),
            },
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &CodeboxConfig {
        &self.config
    }

    /// HTTP lifecycle handle.
    pub fn http_handle(&self) -> ServiceHandle {
        self.state.http.clone()
    }

    /// Debug listener lifecycle handle.
    pub fn debug_handle(&self) -> ServiceHandle {
        self.state.debug.clone()
    }

    /// Build the full application: routes, tracing, and CORS.
    pub fn router(&self) -> Result<Router> {
        // Trace wraps CORS; preflights are logged, then answered by CORS.
        let middleware = ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer(&self.config.cors)?);
        let prefix = &self.config.server.smoke_test_prefix;
        Ok(routes::router(prefix, self.state.clone()).layer(middleware))
    }

    /// Open the debug listener (when enabled) and then the HTTP listener.
    pub async fn bind(self) -> Result<BoundServer> {
        let router = self.router()?;

        let debug = if self.config.debug.enabled {
            Some(DebugListener::bind(&self.config.debug, self.state.debug.clone()).await?)
        } else {
            self.state.debug.set_state(ServiceState::Disabled);
            None
        };

        let addr = self.config.server.bind_string();
        self.state.http.set_state(ServiceState::Starting);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(source) => {
                self.state
                    .http
                    .set_state(ServiceState::Failed(source.to_string()));
                if debug.is_some() {
                    self.state.debug.set_state(ServiceState::Stopped);
                }
                return Err(Error::Bind { addr, source });
            }
        };

        Ok(BoundServer {
            listener,
            router,
            debug,
            wait_for_client: self.config.debug.wait_for_client,
            state: self.state,
        })
    }
}

/// A server whose sockets are open.
pub struct BoundServer {
    listener: TcpListener,
    router: Router,
    debug: Option<DebugListener>,
    wait_for_client: bool,
    state: AppState,
}

impl BoundServer {
    /// HTTP address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Error::Serve)
    }

    /// Debug address actually bound, if the listener is enabled.
    pub fn debug_addr(&self) -> Option<SocketAddr> {
        self.debug.as_ref().and_then(|d| d.local_addr().ok())
    }

    /// Watch debugger attach events, if the listener is enabled.
    pub fn attach_watcher(&self) -> Option<AttachWatcher> {
        self.debug.as_ref().map(DebugListener::watcher)
    }

    /// Serve until `shutdown` is triggered.
    ///
    /// With `wait_for_client`, HTTP serving starts only after the first
    /// debugger attaches (or shutdown is requested first).
    pub async fn run(self, shutdown: Shutdown) -> Result<()> {
        let Self {
            listener,
            router,
            debug,
            wait_for_client,
            state,
        } = self;

        let mut debug_task = None;
        if let Some(debug) = debug {
            let watcher = debug.watcher();
            debug_task = Some(tokio::spawn(debug.run(shutdown.signal())));

            if wait_for_client {
                info!("Waiting for a debugger to attach before serving HTTP");
                tokio::select! {
                    _ = watcher.first_client() => {}
                    _ = shutdown.signal().wait() => {}
                }
            }
        }

        let result = if shutdown.is_triggered() {
            Ok(())
        } else {
            let addr = listener
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_default();
            info!(%addr, "HTTP server listening");
            state.http.set_state(ServiceState::Ready);

            let signal = shutdown.signal();
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    signal.wait().await;
                    info!("HTTP server shutting down");
                })
                .await
                .map_err(Error::Serve)
        };

        state.http.set_state(ServiceState::Stopping);
        // Stop the debug listener too if HTTP ended on its own.
        shutdown.trigger();
        if let Some(task) = debug_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Debug listener task panicked");
            }
        }

        match &result {
            Ok(()) => state.http.set_state(ServiceState::Stopped),
            Err(e) => state.http.set_state(ServiceState::Failed(e.to_string())),
        }
        result
    }
}
