//! Handlers for `codebox devcontainer …`.

use std::path::Path;

use codebox_core::{CodeboxConfig, DevContainer, Result};

use crate::cli::DevcontainerAction;
use crate::config_handlers::write_new_file;

/// Dispatch a devcontainer subcommand.
pub fn handle_devcontainer_command(
    config_path: Option<&str>,
    action: DevcontainerAction,
) -> Result<()> {
    let config = CodeboxConfig::load(config_path)?;
    match action {
        DevcontainerAction::Print => {
            print!("{}", render(&config)?);
            Ok(())
        }
        DevcontainerAction::Write { path, force } => {
            cmd_devcontainer_write(&config, &path, force)?;
            println!("Devcontainer descriptor written to {}", path.display());
            Ok(())
        }
        DevcontainerAction::Check { path } => {
            cmd_devcontainer_check(&config, &path)?;
            println!("{} is consistent with the configuration", path.display());
            Ok(())
        }
    }
}

/// Descriptor JSON for `config`.
pub fn render(config: &CodeboxConfig) -> Result<String> {
    DevContainer::from_config(config).to_json_pretty()
}

/// Write the descriptor for `config` to `path`.
pub fn cmd_devcontainer_write(config: &CodeboxConfig, path: &Path, force: bool) -> Result<()> {
    write_new_file(path, &render(config)?, force)
}

/// Parse `path` and validate it against `config`.
pub fn cmd_devcontainer_check(config: &CodeboxConfig, path: &Path) -> Result<DevContainer> {
    let descriptor = DevContainer::from_file(path)?;
    descriptor.validate(config)?;
    Ok(descriptor)
}
