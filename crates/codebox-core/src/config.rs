//! Configuration for codebox.
//!
//! Configuration is read from a TOML file and then overridden by
//! `CODEBOX_*` environment variables. The file is located by, in order:
//!
//! 1. an explicit path (the `--config` flag)
//! 2. the `CODEBOX_CONFIG` environment variable
//! 3. `<platform config dir>/codebox/config.toml`
//!
//! An explicitly named file must exist; the platform default may be absent,
//! in which case built-in defaults apply.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//! smoke_test_prefix = "/smoke-test"
//!
//! [debug]
//! enabled = true
//! port = 5678
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Project name used for the config directory and env prefix.
pub const PROJECT_NAME: &str = "codebox";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CODEBOX_CONFIG";

/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default remote-debug listener port.
pub const DEFAULT_DEBUG_PORT: u16 = 5678;

/// Default mount point for the smoke-test router.
pub const DEFAULT_SMOKE_TEST_PREFIX: &str = "/smoke-test";

const WILDCARD: &str = "*";

// ============================================================================
// Sections
// ============================================================================

/// HTTP listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port; `0` picks an ephemeral port.
    pub port: u16,
    /// Path prefix the smoke-test router is mounted under.
    pub smoke_test_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_HTTP_PORT,
            smoke_test_prefix: DEFAULT_SMOKE_TEST_PREFIX.to_string(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Cross-origin resource sharing policy.
///
/// A `"*"` entry in any list means "allow everything".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsPolicy {
    /// Allowed origins.
    pub allow_origins: Vec<String>,
    /// Allowed request methods.
    pub allow_methods: Vec<String>,
    /// Allowed request headers.
    pub allow_headers: Vec<String>,
    /// Whether credentialed requests are allowed.
    pub allow_credentials: bool,
    /// Response headers exposed to the browser.
    pub expose_headers: Vec<String>,
    /// How long a preflight result may be cached.
    pub max_age_secs: u64,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: vec![WILDCARD.to_string()],
            allow_methods: vec![WILDCARD.to_string()],
            allow_headers: vec![WILDCARD.to_string()],
            allow_credentials: true,
            expose_headers: Vec::new(),
            max_age_secs: 600,
        }
    }
}

impl CorsPolicy {
    /// Whether a list contains the wildcard entry.
    pub fn is_wildcard(values: &[String]) -> bool {
        values.iter().any(|v| v.trim() == WILDCARD)
    }
}

/// Remote-debug attach listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Whether to open the listener at all.
    pub enabled: bool,
    /// Interface to bind.
    pub host: String,
    /// TCP port; `0` picks an ephemeral port.
    pub port: u16,
    /// Block startup until the first debugger attaches.
    pub wait_for_client: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: DEFAULT_DEBUG_PORT,
            wait_for_client: false,
        }
    }
}

impl DebugConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::config(format!(
                "unknown log format '{other}' (expected 'text' or 'json')"
            ))),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ============================================================================
// CodeboxConfig
// ============================================================================

/// Complete codebox configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeboxConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// CORS policy applied to every response.
    pub cors: CorsPolicy,
    /// Remote-debug listener.
    pub debug: DebugConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl CodeboxConfig {
    /// Default config file location for this platform.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(PROJECT_NAME).join("config.toml"))
    }

    /// Resolve which config file would be used.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        Self::resolve_with(explicit, std::env::var(CONFIG_ENV_VAR).ok())
    }

    fn resolve_with(explicit: Option<&str>, from_env: Option<String>) -> Option<PathBuf> {
        explicit
            .map(PathBuf::from)
            .or_else(|| from_env.filter(|s| !s.is_empty()).map(PathBuf::from))
            .or_else(Self::default_config_path)
    }

    /// Load configuration from file and environment, then validate.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV_VAR).ok().filter(|s| !s.is_empty());
        let must_exist = explicit.is_some() || from_env.is_some();

        let mut config = match Self::resolve_with(explicit, from_env) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if must_exist => {
                return Err(Error::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without applying environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `CODEBOX_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CODEBOX_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("CODEBOX_PORT") {
            self.server.port = parse_port("CODEBOX_PORT", &v)?;
        }
        if let Some(v) = lookup("CODEBOX_DEBUG") {
            self.debug.enabled = parse_bool("CODEBOX_DEBUG", &v)?;
        }
        if let Some(v) = lookup("CODEBOX_DEBUG_HOST") {
            self.debug.host = v;
        }
        if let Some(v) = lookup("CODEBOX_DEBUG_PORT") {
            self.debug.port = parse_port("CODEBOX_DEBUG_PORT", &v)?;
        }
        if let Some(v) = lookup("CODEBOX_WAIT_FOR_CLIENT") {
            self.debug.wait_for_client = parse_bool("CODEBOX_WAIT_FOR_CLIENT", &v)?;
        }
        if let Some(v) = lookup("CODEBOX_LOG") {
            self.logging.filter = v;
        }
        if let Some(v) = lookup("CODEBOX_LOG_FORMAT") {
            self.logging.format = v.parse()?;
        }
        Ok(())
    }

    /// Export as the environment variables [`apply_overrides`](Self::apply_overrides) reads.
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        let format = match self.logging.format {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        };
        vec![
            ("CODEBOX_HOST".into(), self.server.host.clone()),
            ("CODEBOX_PORT".into(), self.server.port.to_string()),
            ("CODEBOX_DEBUG".into(), self.debug.enabled.to_string()),
            ("CODEBOX_DEBUG_HOST".into(), self.debug.host.clone()),
            ("CODEBOX_DEBUG_PORT".into(), self.debug.port.to_string()),
            (
                "CODEBOX_WAIT_FOR_CLIENT".into(),
                self.debug.wait_for_client.to_string(),
            ),
            ("CODEBOX_LOG".into(), self.logging.filter.clone()),
            ("CODEBOX_LOG_FORMAT".into(), format.into()),
        ]
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config("server.host must not be empty"));
        }

        let prefix = &self.server.smoke_test_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(Error::config(format!(
                "server.smoke_test_prefix '{prefix}' must start with '/', be non-root, and have no trailing '/'"
            )));
        }
        if let Some(segment) = prefix[1..].split('/').find(|s| !is_plain_segment(s)) {
            return Err(Error::config(format!(
                "server.smoke_test_prefix '{prefix}' has invalid segment '{segment}' (allowed: A-Z a-z 0-9 . _ ~ -)"
            )));
        }

        if self.debug.enabled {
            if self.debug.host.trim().is_empty() {
                return Err(Error::config("debug.host must not be empty"));
            }
            if self.debug.port != 0 && self.debug.port == self.server.port {
                return Err(Error::config(format!(
                    "debug.port and server.port are both {}",
                    self.server.port
                )));
            }
        }

        Ok(())
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{var}='{value}' is not a valid port")))
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{var}='{value}' is not a boolean"))),
    }
}

// ============================================================================
// Tests
// ============================================================================

/// Literal path segment: non-empty, unreserved URI characters only, so no
/// `{capture}`, `*wildcard` or `:param` syntax reaches the router.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CodeboxConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.smoke_test_prefix, "/smoke-test");
        assert_eq!(config.debug.port, 5678);
        assert_eq!(config.debug.host, "0.0.0.0");
        assert!(config.debug.enabled);
        assert!(!config.debug.wait_for_client);
        assert!(config.cors.allow_credentials);
        assert!(CorsPolicy::is_wildcard(&config.cors.allow_origins));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = CodeboxConfig::from_toml_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn test_toml_roundtrip_preserves_sections() {
        let mut config = CodeboxConfig::default();
        config.logging.format = LogFormat::Json;
        config.cors.allow_origins = vec!["https://example.com".into()];
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("[server]"));
        assert!(rendered.contains("format = \"json\""));
        assert_eq!(CodeboxConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(CodeboxConfig::from_toml_str("[server\nport=").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CodeboxConfig::default();
        config
            .apply_overrides(lookup(&[
                ("CODEBOX_PORT", "9090"),
                ("CODEBOX_DEBUG", "off"),
                ("CODEBOX_DEBUG_PORT", "6000"),
                ("CODEBOX_WAIT_FOR_CLIENT", "1"),
                ("CODEBOX_LOG", "debug"),
                ("CODEBOX_LOG_FORMAT", "JSON"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 9090);
        assert!(!config.debug.enabled);
        assert_eq!(config.debug.port, 6000);
        assert!(config.debug.wait_for_client);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_override_bad_port() {
        let mut config = CodeboxConfig::default();
        let err = config
            .apply_overrides(lookup(&[("CODEBOX_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("CODEBOX_PORT"));
    }

    #[test]
    fn test_env_override_bad_bool() {
        let mut config = CodeboxConfig::default();
        assert!(
            config
                .apply_overrides(lookup(&[("CODEBOX_DEBUG", "maybe")]))
                .is_err()
        );
    }

    #[test]
    fn test_env_vars_feed_back_into_overrides() {
        let mut source = CodeboxConfig::default();
        source.server.port = 8123;
        source.debug.wait_for_client = true;
        let vars: HashMap<String, String> = source.to_env_vars().into_iter().collect();

        let mut target = CodeboxConfig::default();
        target.apply_overrides(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(target.server, source.server);
        assert_eq!(target.debug, source.debug);
        assert_eq!(target.logging, source.logging);
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        for prefix in [
            "smoke",
            "/",
            "/smoke/",
            "/smoke-{",
            "/:x",
            "/a/{*rest}",
            "/a//b",
            "/smoke test",
        ] {
            let mut config = CodeboxConfig::default();
            config.server.smoke_test_prefix = prefix.to_string();
            assert!(config.validate().is_err(), "prefix {prefix} accepted");
        }
    }

    #[test]
    fn test_validate_accepts_nested_prefix() {
        for prefix in ["/smoke-test", "/checks/v1.2", "/a_b/~c"] {
            let mut config = CodeboxConfig::default();
            config.server.smoke_test_prefix = prefix.to_string();
            assert!(config.validate().is_ok(), "prefix {prefix} rejected");
        }
    }

    #[test]
    fn test_validate_rejects_port_clash() {
        let mut config = CodeboxConfig::default();
        config.debug.port = config.server.port;
        assert!(config.validate().is_err());

        config.debug.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_allows_ephemeral_ports() {
        let mut config = CodeboxConfig::default();
        config.server.port = 0;
        config.debug.port = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_prefers_explicit_then_env() {
        let explicit = CodeboxConfig::resolve_with(Some("/a.toml"), Some("/b.toml".into()));
        assert_eq!(explicit, Some(PathBuf::from("/a.toml")));

        let from_env = CodeboxConfig::resolve_with(None, Some("/b.toml".into()));
        assert_eq!(from_env, Some(PathBuf::from("/b.toml")));

        let fallback = CodeboxConfig::resolve_with(None, Some(String::new()));
        assert_eq!(fallback, CodeboxConfig::default_config_path());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[debug]\nenabled = false\n").unwrap();

        let config = CodeboxConfig::from_file(&path).unwrap();
        assert!(!config.debug.enabled);
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let err = CodeboxConfig::load(Some("/nonexistent/codebox.toml")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
