//! log::mock
//!
//! In-memory version log for deterministic testing.
//!
//! # Example
//!
//! ```
//! use ipvl::log::mock::MockLog;
//! use ipvl::log::{VersionLog, VersionRecord};
//!
//! # tokio_test::block_on(async {
//! let log = MockLog::new();
//!
//! let identity = log.update(VersionRecord {
//!     name: Some("demo".to_string()),
//!     description: None,
//!     author: None,
//!     version: "1.0.0".to_string(),
//!     snapshot_dir: "/tmp/demo/.ipvl/data/1.0.0".into(),
//! }).await.unwrap();
//!
//! assert_eq!(log.records().len(), 1);
//! assert_eq!(log.identity().await.unwrap(), Some(identity));
//! # });
//! ```

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::traits::{LogError, LogIdentity, VersionLog, VersionRecord};

/// Mock log for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockLog {
    inner: Arc<Mutex<MockLogInner>>,
}

#[derive(Debug)]
struct MockLogInner {
    /// Accepted records, in append order.
    records: Vec<VersionRecord>,
    /// Identity returned by every update.
    identity: LogIdentity,
    /// Error to return from `update` instead of accepting.
    fail_with: Option<LogError>,
}

impl MockLog {
    /// Create an empty mock log with a fixed identity.
    pub fn new() -> Self {
        Self::with_identity(LogIdentity {
            public_key: vec![0x11; 32],
            secret_key: vec![0x22; 64],
            discovery_key: vec![0x33; 32],
        })
    }

    /// Create an empty mock log returning `identity`.
    pub fn with_identity(identity: LogIdentity) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockLogInner {
                records: Vec::new(),
                identity,
                fail_with: None,
            })),
        }
    }

    /// Configure `update` to fail with `error`.
    ///
    /// # Example
    ///
    /// ```
    /// use ipvl::log::mock::MockLog;
    /// use ipvl::log::LogError;
    ///
    /// let log = MockLog::new().fail_with(LogError::Locked);
    /// ```
    pub fn fail_with(self, error: LogError) -> Self {
        self.lock().fail_with = Some(error);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail(&self) {
        self.lock().fail_with = None;
    }

    /// All accepted records (for test verification).
    pub fn records(&self) -> Vec<VersionRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockLogInner> {
        // A poisoned mutex only means another test thread panicked mid-update.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VersionLog for MockLog {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn update(&self, record: VersionRecord) -> Result<LogIdentity, LogError> {
        let mut inner = self.lock();
        if let Some(error) = &inner.fail_with {
            return Err(error.clone());
        }
        inner.records.push(record);
        Ok(inner.identity.clone())
    }

    async fn identity(&self) -> Result<Option<LogIdentity>, LogError> {
        let inner = self.lock();
        Ok((!inner.records.is_empty()).then(|| inner.identity.clone()))
    }
}
