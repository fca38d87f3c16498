//! TOML-based configuration for the controller.
//!
//! Reads `ControllerConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\KeyBridge\controller.toml`
//! - Linux:    `~/.config/keybridge/controller.toml`
//! - macOS:    `~/Library/Application Support/KeyBridge/controller.toml`
//!
//! Setting `KEYBRIDGE_CONFIG` to a file path overrides the location.
//!
//! Example:
//!
//! ```toml
//! [controller]
//! hotkey = "f12"
//! restart_pause_ms = 100
//! log_level = "info"
//!
//! [network]
//! port = 65432
//! keepalive = true
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section and
//! a missing key all fall back to the values above.

use std::path::{Path, PathBuf};
use std::time::Duration;

use keybridge_core::protocol::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "KEYBRIDGE_CONFIG";

const CONFIG_FILE_NAME: &str = "controller.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ControllerConfig {
    #[serde(default)]
    pub controller: ControllerSection,
    #[serde(default)]
    pub network: NetworkSection,
}

/// Capture and logging behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerSection {
    /// Symbolic name of the key that toggles forwarding.
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
    /// Pause between stopping and reinstalling the hook, in milliseconds.
    #[serde(default = "default_restart_pause_ms")]
    pub restart_pause_ms: u64,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enable TCP keep-alive on the connection to the target.
    #[serde(default = "default_true")]
    pub keepalive: bool,
}

impl ControllerSection {
    pub fn restart_pause(&self) -> Duration {
        Duration::from_millis(self.restart_pause_ms)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_hotkey() -> String {
    "f12".to_string()
}
fn default_restart_pause_ms() -> u64 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_true() -> bool {
    true
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            hotkey: default_hotkey(),
            restart_pause_ms: default_restart_pause_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            keepalive: default_true(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the config file path: `KEYBRIDGE_CONFIG` if set, otherwise
/// `controller.toml` in the platform config directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if neither is available.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    platform_config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the configuration from [`config_file_path`].
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<ControllerConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the configuration from `path`, returning defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ControllerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ControllerConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Resolves the platform config base directory including the `KeyBridge`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("KeyBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("keybridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("KeyBridge")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
