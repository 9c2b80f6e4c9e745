//! log::lock
//!
//! Exclusive lock on a log directory.
//!
//! # Storage
//!
//! - `<log_dir>/LOCK` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - The lock is held for the whole append (store, sign, write entry)
//! - Lock is released on drop
//! - Acquisition is non-blocking (fails fast if locked)

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use fs2::FileExt;
use thiserror::Error;

/// Name of the lock file inside the log directory.
pub const LOCK_FILE: &str = "LOCK";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("log is locked by another process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on a log directory.
#[derive(Debug)]
pub struct LogLock {
    /// The open file handle with the lock held.
    file: Option<File>,
}

impl LogLock {
    /// Attempt to acquire the lock for `log_dir`.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    /// Creates `log_dir` if needed.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(log_dir: &Path) -> Result<Self, LockError> {
        fs::create_dir_all(log_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", log_dir.display(), e))
        })?;

        let path = log_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file: Some(file) }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }
}

impl Drop for LogLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}
