//! log::traits
//!
//! VersionLog trait definition for the append-only log that receives
//! finished snapshots.
//!
//! # Design
//!
//! The `VersionLog` trait is async because a backend may talk to remote
//! storage. The core never inspects how entries are serialized or how
//! content is addressed; it hands over a [`VersionRecord`] and gets a
//! [`LogIdentity`] back.
//!
//! # Example
//!
//! ```ignore
//! use ipvl::log::{VersionLog, VersionRecord};
//!
//! async fn release(log: &dyn VersionLog, record: VersionRecord) -> Result<(), LogError> {
//!     let identity = log.update(record).await?;
//!     println!("Public key: {}", identity.public_key_hex());
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from version log operations.
#[derive(Debug, Clone, Error)]
pub enum LogError {
    /// The storage provider failed to store the snapshot.
    #[error("storage error: {0}")]
    Storage(String),

    /// The log directory could not be read or written.
    #[error("log i/o error: {0}")]
    Io(String),

    /// Another process is appending to the same log.
    #[error("log is locked by another process")]
    Locked,

    /// Existing log state could not be decoded.
    #[error("corrupt log: {0}")]
    Corrupt(String),

    /// The backend is not available in this build.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Metadata and snapshot location for one published version.
///
/// Ownership transfers to the log on [`VersionLog::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Package name
    pub name: Option<String>,
    /// Package description
    pub description: Option<String>,
    /// Package author
    pub author: Option<String>,
    /// Version label
    pub version: String,
    /// Directory holding the finished snapshot
    pub snapshot_dir: PathBuf,
}

/// Keys identifying a log after it accepted a version.
///
/// All three are opaque byte sequences; they are only ever displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogIdentity {
    /// Public key of the log
    pub public_key: Vec<u8>,
    /// Secret key allowing further appends
    pub secret_key: Vec<u8>,
    /// Key peers use to find the log without learning its public key
    pub discovery_key: Vec<u8>,
}

impl LogIdentity {
    /// Public key as lowercase hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    /// Secret key as lowercase hex.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(&self.secret_key)
    }

    /// Discovery key as lowercase hex.
    pub fn discovery_key_hex(&self) -> String {
        hex::encode(&self.discovery_key)
    }
}

/// The VersionLog trait for the external append-only log.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, LogError>`. A failed `update` means the
/// version was not published; the snapshot stays on disk for a retry.
#[async_trait]
pub trait VersionLog: Send + Sync {
    /// Get the backend name (e.g., "file", "memory").
    fn name(&self) -> &'static str;

    /// Append a version to the log.
    ///
    /// # Returns
    ///
    /// The log's identity after the append.
    ///
    /// # Errors
    ///
    /// - `Storage` if the snapshot could not be stored
    /// - `Locked` if another append is in progress
    async fn update(&self, record: VersionRecord) -> Result<LogIdentity, LogError>;

    /// Get the log's identity without appending.
    ///
    /// Returns `None` if nothing has been appended yet.
    async fn identity(&self) -> Result<Option<LogIdentity>, LogError>;
}
