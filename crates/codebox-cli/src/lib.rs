//! # codebox-cli
//!
//! Command-line entry point for codebox:
//! - `serve` starts the HTTP server and debug listener
//! - `config` inspects and edits the TOML configuration
//! - `devcontainer` generates and checks `.devcontainer/devcontainer.json`

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod config_handlers;
pub mod devcontainer_handlers;
pub mod error;
pub mod logging;
pub mod serve;

pub use cli::{Cli, Command};
pub use error::{Error, Result};

use codebox_core::CodeboxConfig;

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Serve(args) => {
            let mut config = CodeboxConfig::load(config_path)?;
            args.apply(&mut config);
            logging::init_logging(&config.logging)?;
            tracing::info!(
                http = %config.server.bind_string(),
                debug = config.debug.enabled,
                "Starting codebox"
            );
            serve::serve(config).await?;
        }
        Command::Config { action } => {
            config_handlers::handle_config_command(config_path, action)?;
        }
        Command::Devcontainer { action } => {
            devcontainer_handlers::handle_devcontainer_command(config_path, action)?;
        }
    }

    Ok(())
}
