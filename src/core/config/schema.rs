//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing: the copy concurrency must be
//! positive and the log backend must be one this build knows about, matched
//! case-insensitively like `--log-backend`.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::log::{valid_backend_names, LogBackend};

/// User-level configuration.
///
/// # Example
///
/// ```toml
/// [snapshot]
/// concurrency = 16
///
/// [log]
/// backend = "file"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Snapshot copy settings
    pub snapshot: Option<SnapshotConfig>,

    /// Version log settings
    pub log: Option<LogConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(snapshot) = &self.snapshot {
            snapshot.validate()?;
        }
        if let Some(log) = &self.log {
            log.validate()?;
        }
        Ok(())
    }
}

/// Snapshot copy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// Maximum number of top-level entries copied at once
    pub concurrency: Option<usize>,
}

impl SnapshotConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == Some(0) {
            return Err(ConfigError::InvalidValue(
                "snapshot.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Version log settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Log backend name ("file" or "memory", any case)
    pub backend: Option<String>,
}

impl LogConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(backend) = &self.backend {
            if LogBackend::parse(backend).is_none() {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid log backend '{}', must be one of: {}",
                    backend,
                    valid_backend_names().join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(GlobalConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = GlobalConfig {
            snapshot: Some(SnapshotConfig {
                concurrency: Some(0),
            }),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn unknown_backend_rejected() {
        let config = GlobalConfig {
            log: Some(LogConfig {
                backend: Some("carrier-pigeon".to_string()),
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn backend_names_are_case_insensitive() {
        for name in ["FILE", "Memory", "memory"] {
            let config = GlobalConfig {
                log: Some(LogConfig {
                    backend: Some(name.to_string()),
                }),
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "{} rejected", name);
        }
    }

    #[test]
    fn parses_full_file() {
        let config: GlobalConfig = toml::from_str(
            r#"
            [snapshot]
            concurrency = 4

            [log]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.snapshot.unwrap().concurrency, Some(4));
        assert_eq!(config.log.unwrap().backend.as_deref(), Some("memory"));
    }
}
