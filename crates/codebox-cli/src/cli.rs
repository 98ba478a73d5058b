//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use codebox_core::CodeboxConfig;
use codebox_core::devcontainer::DEFAULT_DESCRIPTOR_PATH;

/// Codebox — health-checked HTTP service with a debug attach listener
#[derive(Parser, Debug)]
#[command(name = "codebox", version)]
#[command(about = "Run the codebox service and manage its configuration", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CODEBOX_CONFIG")]
    pub config: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server and debug listener
    Serve(ServeArgs),

    /// Inspect or edit the configuration file
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate or check the devcontainer descriptor
    Devcontainer {
        /// Devcontainer action
        #[command(subcommand)]
        action: DevcontainerAction,
    },
}

/// Overrides for `codebox serve`.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Interface to bind the HTTP server to
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Do not open the debug listener
    #[arg(long)]
    pub no_debug: bool,

    /// Debug listener port
    #[arg(long)]
    pub debug_port: Option<u16>,

    /// Block until a debugger attaches before serving HTTP
    #[arg(long)]
    pub wait_for_client: bool,
}

impl ServeArgs {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut CodeboxConfig) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.no_debug {
            config.debug.enabled = false;
        }
        if let Some(port) = self.debug_port {
            config.debug.port = port;
        }
        if self.wait_for_client {
            config.debug.wait_for_client = true;
        }
    }
}

/// `codebox config …` actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved config file path
    Path,

    /// Print a value by dotted key (e.g. `server.port`)
    Get {
        /// Dotted key
        key: String,
    },

    /// Set a value by dotted key in the config file
    Set {
        /// Dotted key
        key: String,
        /// New value (bool, integer, float, or string)
        value: String,
    },

    /// Write a default config file
    Init {
        /// Destination (defaults to the platform config path)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration as CODEBOX_* environment variables
    Export {
        /// Format as `--env KEY=VALUE` for `docker run`
        #[arg(long)]
        docker_env: bool,
    },
}

/// `codebox devcontainer …` actions.
#[derive(Subcommand, Debug)]
pub enum DevcontainerAction {
    /// Print the descriptor for the current configuration
    Print,

    /// Write the descriptor to disk
    Write {
        /// Destination file
        #[arg(long, default_value = DEFAULT_DESCRIPTOR_PATH)]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate an existing descriptor against the current configuration
    Check {
        /// Descriptor file
        #[arg(long, default_value = DEFAULT_DESCRIPTOR_PATH)]
        path: PathBuf,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "codebox",
            "serve",
            "--port",
            "9000",
            "--no-debug",
            "--wait-for-client",
        ])
        .unwrap();
        let Command::Serve(args) = cli.command else {
            unreachable!("expected serve");
        };

        let mut config = CodeboxConfig::default();
        args.apply(&mut config);
        assert_eq!(config.server.port, 9000);
        assert!(!config.debug.enabled);
        assert!(config.debug.wait_for_client);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["codebox", "config", "get", "server.port", "-c", "/tmp/c.toml"])
                .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Get { .. }
            }
        ));
    }

    #[test]
    fn test_devcontainer_write_default_path() {
        let cli = Cli::try_parse_from(["codebox", "devcontainer", "write"]).unwrap();
        match cli.command {
            Command::Devcontainer {
                action: DevcontainerAction::Write { path, force },
            } => {
                assert_eq!(path, PathBuf::from(DEFAULT_DESCRIPTOR_PATH));
                assert!(!force);
            }
            other => unreachable!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["codebox"]).is_err());
    }
}
