//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. CLI flags (applied by the command layer, not here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$IPVL_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ipvl/config.toml`
//! 3. `~/.ipvl/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use ipvl::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Copy concurrency: {}", config.copy_concurrency());
//! println!("Log backend: {}", config.log_backend());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, LogConfig, SnapshotConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::snapshot::DEFAULT_COPY_CONCURRENCY;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "IPVL_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration.
///
/// Accessor methods apply defaults for anything not configured.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Path to the config file (if loaded)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::locate().as_deref())
    }

    /// Load configuration from an explicit file, or defaults for `None`.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let global: GlobalConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        global.validate()?;

        Ok(Self {
            global,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first existing config file in the standard locations.
    pub fn locate() -> Option<PathBuf> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let xdg = std::env::var_os("XDG_CONFIG_HOME")
            .map(|home| PathBuf::from(home).join("ipvl/config.toml"));
        let home = dirs::home_dir().map(|home| home.join(".ipvl/config.toml"));

        [explicit, xdg, home]
            .into_iter()
            .flatten()
            .find(|path| path.exists())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Maximum number of top-level entries copied at once.
    ///
    /// Defaults to [`DEFAULT_COPY_CONCURRENCY`].
    pub fn copy_concurrency(&self) -> usize {
        self.global
            .snapshot
            .as_ref()
            .and_then(|s| s.concurrency)
            .unwrap_or(DEFAULT_COPY_CONCURRENCY)
    }

    /// Name of the version log backend.
    ///
    /// Defaults to "file".
    pub fn log_backend(&self) -> &str {
        self.global
            .log
            .as_ref()
            .and_then(|l| l.backend.as_deref())
            .unwrap_or("file")
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
