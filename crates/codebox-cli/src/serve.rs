//! `codebox serve`.

use codebox_api::Server;
use codebox_core::{CodeboxConfig, Shutdown};
use tracing::{error, info};

use crate::error::Result;

/// Bind, serve, and block until ctrl-c or SIGTERM.
pub async fn serve(config: CodeboxConfig) -> Result<()> {
    let bound = Server::new(config)?.bind().await?;

    if let Some(addr) = bound.debug_addr() {
        info!(%addr, pid = std::process::id(), "Debugger can attach");
    }

    let shutdown = Shutdown::new();
    spawn_signal_listeners(&shutdown);

    bound.run(shutdown).await?;
    info!("codebox stopped");
    Ok(())
}

fn spawn_signal_listeners(shutdown: &Shutdown) {
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                on_interrupt.trigger();
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGINT"),
        }
    });

    #[cfg(unix)]
    {
        let on_terminate = shutdown.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM, initiating graceful shutdown");
                    on_terminate.trigger();
                }
                Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
            }
        });
    }
}
