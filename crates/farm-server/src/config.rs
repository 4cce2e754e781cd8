//! TOML configuration for the farm server.
//!
//! Resolution order for the file:
//! 1. `$FARM_SERVER_CONFIG`, if set.
//! 2. The platform config directory:
//!    - Linux:   `$XDG_CONFIG_HOME/farmwire/server.toml` or `~/.config/farmwire/server.toml`
//!    - macOS:   `~/Library/Application Support/farmwire/server.toml`
//!    - Windows: `%APPDATA%\farmwire\server.toml`
//!
//! A missing file is not an error: every field has a default, so the server
//! also runs with a partial file or none at all.
//!
//! ```toml
//! [server]
//! log_level = "info"
//!
//! [database]
//! queue_name = "db"
//! spool_path = "farm-db.spool"
//! reconnect_interval_ms = 1000
//! shutdown = "drain"
//!
//! [monitor]
//! alarm_capacity = 64
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::{QueueConfig, ShutdownPolicy};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "FARM_SERVER_CONFIG";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the override variable nor a platform config directory is available.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub monitor: MonitorSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    /// Queue name shown in logs and monitor alarms.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// File the spool connection appends statements to.
    #[serde(default = "default_spool_path")]
    pub spool_path: PathBuf,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default)]
    pub shutdown: ShutdownPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSection {
    /// Alarm messages buffered for monitors before new ones are dropped.
    #[serde(default = "default_alarm_capacity")]
    pub alarm_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_queue_name() -> String {
    "db".to_string()
}
fn default_spool_path() -> PathBuf {
    PathBuf::from("farm-db.spool")
}
fn default_reconnect_interval_ms() -> u64 {
    1000
}
fn default_alarm_capacity() -> usize {
    64
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            spool_path: default_spool_path(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            shutdown: ShutdownPolicy::default(),
        }
    }
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            alarm_capacity: default_alarm_capacity(),
        }
    }
}

impl DatabaseSection {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(
            self.queue_name.clone(),
            Duration::from_millis(self.reconnect_interval_ms),
        )
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the config file path from the environment.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither the override
/// variable nor a platform directory is available.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    platform_config_dir()
        .map(|dir| dir.join("server.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from the resolved path.
///
/// # Errors
///
/// See [`config_file_path`] and [`load_config_from`].
pub fn load_config() -> Result<ServerConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config at `path`, returning the defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ServerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ServerConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("farmwire"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("farmwire"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("farmwire")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
