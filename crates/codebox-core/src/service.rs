//! Service lifecycle tracking and shutdown signalling.
//!
//! Each long-running listener (the HTTP server, the debug listener) owns a
//! [`ServiceHandle`]; the process owns one [`Shutdown`] that all of them
//! observe.
//!
//! ```rust
//! use codebox_core::service::{ServiceHandle, ServiceState};
//!
//! let http = ServiceHandle::new("http");
//! http.set_state(ServiceState::Starting);
//! http.set_state(ServiceState::Ready);
//! assert!(http.state().is_ready());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

// ============================================================================
// ServiceState
// ============================================================================

/// Where a service is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum ServiceState {
    /// Not started, or finished.
    Stopped,
    /// Binding sockets.
    Starting,
    /// Accepting connections.
    Ready,
    /// Draining after a shutdown request.
    Stopping,
    /// Could not start or crashed.
    Failed(String),
    /// Deliberately not run (e.g. the debug listener when disabled).
    Disabled,
}

impl ServiceState {
    /// Returns `true` if the service is accepting connections.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` if the service will not change state on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_) | Self::Disabled)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Stopping => write!(f, "stopping"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

// ============================================================================
// ServiceHandle
// ============================================================================

/// Shared, cloneable view of one service's state.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    name: String,
    tx: watch::Sender<ServiceState>,
    created_at: Instant,
}

impl ServiceHandle {
    /// Create a handle in [`ServiceState::Stopped`].
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(ServiceState::Stopped);
        Self {
            inner: Arc::new(HandleInner {
                name: name.into(),
                tx,
                created_at: Instant::now(),
            }),
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        self.inner.tx.borrow().clone()
    }

    /// Transition to `state`, notifying subscribers.
    pub fn set_state(&self, state: ServiceState) {
        log::info!("Service '{}' -> {state}", self.inner.name);
        self.inner.tx.send_replace(state);
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.inner.tx.subscribe()
    }

    /// Wait until the service is Ready, fails, or `timeout` passes.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), String> {
        let mut rx = self.subscribe();
        let name = self.inner.name.clone();

        let outcome = tokio::time::timeout(
            timeout,
            rx.wait_for(|s| s.is_ready() || matches!(s, ServiceState::Failed(_))),
        )
        .await;

        match outcome {
            Err(_) => Err(format!(
                "Service '{name}' not ready after {timeout:?} (state: {})",
                self.state()
            )),
            Ok(Err(_)) => Err(format!("Service '{name}' channel closed")),
            Ok(Ok(state)) => match &*state {
                ServiceState::Failed(reason) => Err(format!("Service '{name}' failed: {reason}")),
                _ => Ok(()),
            },
        }
    }

    /// Time since the handle was created.
    pub fn uptime(&self) -> Duration {
        self.inner.created_at.elapsed()
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Shutdown
// ============================================================================

/// Process-wide shutdown trigger.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create an untriggered shutdown.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// A future-producing listener for this shutdown.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`Shutdown`].
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered (immediately if it already was).
    pub async fn wait(mut self) {
        // A closed channel means the owner is gone, treat it as shutdown.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
