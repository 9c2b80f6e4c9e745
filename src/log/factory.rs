//! log::factory
//!
//! Version log backend selection and creation.
//!
//! Commands use [`create_log`] instead of constructing backends directly, so
//! the orchestrator only ever sees `dyn VersionLog`.
//!
//! # Backends
//!
//! - `file` - [`FileLog`] over a [`BlobStore`] under the log directory
//! - `memory` - [`MockLog`]; accepts versions and forgets them on exit

use std::path::Path;
use std::sync::Arc;

use super::file::FileLog;
use super::mock::MockLog;
use super::storage::BlobStore;
use super::traits::{LogError, VersionLog};

/// Directory under the log root holding content blobs.
pub const BLOBS_DIR: &str = "blobs";

/// Supported log backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogBackend {
    /// Local signed append-only log
    File,
    /// In-process log, nothing persisted
    Memory,
}

impl LogBackend {
    /// Get all available backends.
    pub fn all() -> &'static [LogBackend] {
        &[LogBackend::File, LogBackend::Memory]
    }

    /// Get the backend name as used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            LogBackend::File => "file",
            LogBackend::Memory => "memory",
        }
    }

    /// Parse a backend from a string.
    ///
    /// # Example
    ///
    /// ```
    /// use ipvl::log::LogBackend;
    ///
    /// assert_eq!(LogBackend::parse("file"), Some(LogBackend::File));
    /// assert_eq!(LogBackend::parse("MEMORY"), Some(LogBackend::Memory));
    /// assert_eq!(LogBackend::parse("ipfs"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" => Some(LogBackend::File),
            "memory" => Some(LogBackend::Memory),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Names accepted in config files and on the command line.
pub fn valid_backend_names() -> Vec<&'static str> {
    LogBackend::all().iter().map(|b| b.name()).collect()
}

/// Create the version log for `log_dir`.
///
/// # Errors
///
/// - `LogError::NotImplemented` if `backend` is not a known backend name
pub fn create_log(backend: &str, log_dir: &Path) -> Result<Box<dyn VersionLog>, LogError> {
    let backend = LogBackend::parse(backend).ok_or_else(|| {
        LogError::NotImplemented(format!(
            "unknown log backend '{}'. Available backends: {}",
            backend,
            valid_backend_names().join(", ")
        ))
    })?;

    Ok(match backend {
        LogBackend::File => {
            let storage = Arc::new(BlobStore::new(log_dir.join(BLOBS_DIR)));
            Box::new(FileLog::new(storage, log_dir))
        }
        LogBackend::Memory => Box::new(MockLog::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for backend in LogBackend::all() {
            assert_eq!(LogBackend::parse(backend.name()), Some(*backend));
        }
    }

    #[test]
    fn create_known_backends() {
        let dir = Path::new("/tmp/project/.ipvl/log");
        assert_eq!(create_log("file", dir).unwrap().name(), "file");
        assert_eq!(create_log("memory", dir).unwrap().name(), "memory");
    }

    #[test]
    fn create_unknown_backend_fails() {
        let err = create_log("ipfs", Path::new("/tmp")).err().unwrap();
        assert!(matches!(err, LogError::NotImplemented(_)));
        assert!(err.to_string().contains("file, memory"));
    }
}
