//! Development-container descriptor (`.devcontainer/devcontainer.json`).
//!
//! The descriptor tells the editor how to build the image, which extensions
//! to install, which ports to publish, and where the project is mounted.
//! [`DevContainer::from_config`] derives it from a [`CodeboxConfig`] so the
//! published debug port always matches the listener.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CodeboxConfig;
use crate::error::{Error, Result};

/// Directory the project is mounted at inside the container.
pub const CONTAINER_WORKDIR: &str = "/code";

/// Conventional location relative to the project root.
pub const DEFAULT_DESCRIPTOR_PATH: &str = ".devcontainer/devcontainer.json";

/// Editor extensions installed in the container.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "rust-lang.rust-analyzer",
    "vadimcn.vscode-lldb",
    "tamasfe.even-better-toml",
];

/// Image build source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    /// Dockerfile path, relative to the descriptor.
    pub dockerfile: String,
    /// Build context, relative to the descriptor.
    pub context: String,
}

/// Editor-specific settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customizations {
    /// VS Code settings.
    #[serde(default)]
    pub vscode: VsCode,
}

/// VS Code customizations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsCode {
    /// Extension identifiers to install.
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Per-port display attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortAttributes {
    /// Label shown in the editor's ports view.
    pub label: String,
    /// What to do when the port is detected (`silent`, `notify`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_auto_forward: Option<String>,
}

/// A `devcontainer.json` document.
///
/// Only the fields codebox manages are modelled; others are ignored on read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevContainer {
    /// Display name.
    pub name: String,
    /// Image build source.
    pub build: BuildSpec,
    /// Editor customizations.
    #[serde(default)]
    pub customizations: Customizations,
    /// Ports forwarded by the editor.
    #[serde(default)]
    pub forward_ports: Vec<u16>,
    /// Published `host:container` port mappings.
    #[serde(default)]
    pub app_port: Vec<String>,
    /// Port labels keyed by port number.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports_attributes: BTreeMap<String, PortAttributes>,
    /// Extra `docker run` arguments.
    #[serde(default)]
    pub run_args: Vec<String>,
    /// Mount spec for the project directory.
    pub workspace_mount: String,
    /// Working directory inside the container.
    pub workspace_folder: String,
}

impl DevContainer {
    /// Build the descriptor for a given configuration.
    pub fn from_config(config: &CodeboxConfig) -> Self {
        let http_port = config.server.port;
        let debug_port = config.debug.port;

        let mut forward_ports = vec![http_port];
        let mut app_port = Vec::new();
        let mut ports_attributes = BTreeMap::new();
        ports_attributes.insert(
            http_port.to_string(),
            PortAttributes {
                label: "codebox http".into(),
                on_auto_forward: Some("notify".into()),
            },
        );

        if config.debug.enabled {
            forward_ports.push(debug_port);
            app_port.push(format!("{debug_port}:{debug_port}"));
            ports_attributes.insert(
                debug_port.to_string(),
                PortAttributes {
                    label: "debug attach".into(),
                    on_auto_forward: Some("silent".into()),
                },
            );
        }

        Self {
            name: "codebox".into(),
            build: BuildSpec {
                dockerfile: "../Dockerfile".into(),
                context: "..".into(),
            },
            customizations: Customizations {
                vscode: VsCode {
                    extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
                },
            },
            forward_ports,
            app_port,
            ports_attributes,
            // Attaching a native debugger needs ptrace inside the container.
            run_args: vec![
                "--cap-add=SYS_PTRACE".into(),
                "--security-opt".into(),
                "seccomp=unconfined".into(),
            ],
            workspace_mount: format!(
                "source=${{localWorkspaceFolder}},target={CONTAINER_WORKDIR},type=bind"
            ),
            workspace_folder: CONTAINER_WORKDIR.into(),
        }
    }

    /// Parse a descriptor. Full-line `//` comments are allowed.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(&strip_line_comments(s))?)
    }

    /// Read and parse a descriptor file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        Self::from_json(&content)
    }

    /// Render as pretty-printed JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Target of the `workspaceMount` spec, if present.
    pub fn mount_target(&self) -> Option<&str> {
        self.workspace_mount
            .split(',')
            .filter_map(|part| part.split_once('='))
            .find(|(k, _)| matches!(k.trim(), "target" | "destination" | "dst"))
            .map(|(_, v)| v.trim())
    }

    /// Whether `host_port` is published to `container_port`.
    pub fn maps_port(&self, host_port: u16, container_port: u16) -> bool {
        let wanted = format!("{host_port}:{container_port}");
        self.app_port.iter().any(|p| p.trim() == wanted)
    }

    /// Check the descriptor is consistent with `config`.
    pub fn validate(&self, config: &CodeboxConfig) -> Result<()> {
        if !self.workspace_folder.starts_with('/') {
            return Err(Error::devcontainer(format!(
                "workspaceFolder '{}' must be an absolute path",
                self.workspace_folder
            )));
        }

        match self.mount_target() {
            Some(target) if target == self.workspace_folder => {}
            Some(target) => {
                return Err(Error::devcontainer(format!(
                    "workspaceMount target '{target}' differs from workspaceFolder '{}'",
                    self.workspace_folder
                )));
            }
            None => {
                return Err(Error::devcontainer(
                    "workspaceMount has no target= component",
                ));
            }
        }

        if self.build.dockerfile.trim().is_empty() {
            return Err(Error::devcontainer("build.dockerfile must not be empty"));
        }

        if config.debug.enabled && !self.maps_port(config.debug.port, config.debug.port) {
            return Err(Error::devcontainer(format!(
                "debug port {port} is not published (expected appPort entry \"{port}:{port}\")",
                port = config.debug.port
            )));
        }

        Ok(())
    }
}

/// Drop lines whose first non-blank characters are `//`.
fn strip_line_comments(s: &str) -> String {
    s.lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_descriptor() {
        let dc = DevContainer::from_config(&CodeboxConfig::default());
        assert_eq!(dc.workspace_folder, "/code");
        assert_eq!(dc.mount_target(), Some("/code"));
        assert!(dc.maps_port(5678, 5678));
        assert!(dc.forward_ports.contains(&8000));
        assert!(
            dc.customizations
                .vscode
                .extensions
                .contains(&"rust-lang.rust-analyzer".to_string())
        );
        assert!(dc.validate(&CodeboxConfig::default()).is_ok());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let json = DevContainer::from_config(&CodeboxConfig::default())
            .to_json_pretty()
            .unwrap();
        assert!(json.contains("\"workspaceFolder\": \"/code\""));
        assert!(json.contains("\"appPort\""));
        assert!(json.contains("\"5678:5678\""));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_parse_with_comments() {
        let dc = DevContainer::from_config(&CodeboxConfig::default());
        let json = format!("// generated\n{}", dc.to_json_pretty().unwrap());
        assert_eq!(DevContainer::from_json(&json).unwrap(), dc);
    }

    #[test]
    fn test_debug_disabled_omits_mapping() {
        let mut config = CodeboxConfig::default();
        config.debug.enabled = false;
        let dc = DevContainer::from_config(&config);
        assert!(dc.app_port.is_empty());
        assert_eq!(dc.forward_ports, vec![8000]);
        assert!(dc.validate(&config).is_ok());
    }

    #[test]
    fn test_validate_missing_debug_mapping() {
        let config = CodeboxConfig::default();
        let mut dc = DevContainer::from_config(&config);
        dc.app_port.clear();
        let err = dc.validate(&config).unwrap_err();
        assert!(err.to_string().contains("5678"));
    }

    #[test]
    fn test_validate_mount_mismatch() {
        let config = CodeboxConfig::default();
        let mut dc = DevContainer::from_config(&config);
        dc.workspace_folder = "/workspace".into();
        let err = dc.validate(&config).unwrap_err();
        assert!(err.to_string().contains("differs"));
    }

    #[test]
    fn test_validate_relative_folder() {
        let config = CodeboxConfig::default();
        let mut dc = DevContainer::from_config(&config);
        dc.workspace_folder = "code".into();
        assert!(dc.validate(&config).is_err());
    }

    #[test]
    fn test_shipped_descriptor_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .join(DEFAULT_DESCRIPTOR_PATH);
        let dc = DevContainer::from_file(&path).unwrap();
        dc.validate(&CodeboxConfig::default()).unwrap();
        assert_eq!(dc, DevContainer::from_config(&CodeboxConfig::default()));
    }
}
