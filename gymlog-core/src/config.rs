//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/gymlog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/gymlog/` (~/.config/gymlog/)
//! - Data: `$XDG_DATA_HOME/gymlog/` (~/.local/share/gymlog/)
//! - State/Logs: `$XDG_STATE_HOME/gymlog/` (~/.local/state/gymlog/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observable query tuning
    #[serde(default)]
    pub observers: ObserverConfig,
}

/// Database configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DatabaseConfig {
    /// Override for the SQLite file (defaults to the XDG data directory)
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Observable query configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ObserverConfig {
    /// Buffered table-change notifications before slow observers lag
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl ObserverConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::Config(
                "observers.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_channel_capacity() -> usize {
    64
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.observers.validate()?;
        Ok(config)
    }

    /// Returns the configured database path, falling back to the XDG default
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/gymlog/config.toml` (~/.config/gymlog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("gymlog").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("gymlog")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("gymlog")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/gymlog/gymlog.db` (~/.local/share/gymlog/gymlog.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("gymlog.db")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("gymlog.log")
    }
}
