//! log::file
//!
//! Local append-only version log.
//!
//! # Design
//!
//! `FileLog` keeps a signed, hash-chained list of versions in the log
//! directory. Snapshot contents go to a [`StorageProvider`]; the log itself
//! only records the returned content id next to the package metadata.
//!
//! The log is identified by an ed25519 keypair created on the first append
//! and reused by every later append. Republishing with `--force` clears the
//! control directory, so it starts a new log with new keys.
//!
//! # Storage
//!
//! - `<log_dir>/identity.json` - Keypair (hex)
//! - `<log_dir>/entries.jsonl` - One signed entry per line
//! - `<log_dir>/LOCK` - Held for the duration of an append
//!
//! # Invariants
//!
//! - Entries are only ever appended
//! - `seq` starts at 0 and increases by one per entry
//! - `prev` is the SHA-256 of the previous entry's line (absent for seq 0)
//! - Each signature covers the entry without its signature field

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::lock::{LockError, LogLock};
use super::storage::{ContentId, StorageProvider};
use super::traits::{LogError, LogIdentity, VersionLog, VersionRecord};

/// File holding the log keypair.
pub const IDENTITY_FILE: &str = "identity.json";

/// File holding the log entries.
pub const ENTRIES_FILE: &str = "entries.jsonl";

/// Domain separator for discovery keys.
const DISCOVERY_CONTEXT: &[u8] = b"ipvl-discovery";

/// The signed part of a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryBody {
    pub seq: u64,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub content: ContentId,
    pub prev: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One line of `entries.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(flatten)]
    pub body: EntryBody,
    /// ed25519 signature over the JSON encoding of `body`, hex
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    public_key: String,
    secret_key: String,
}

/// Append-only version log on the local filesystem.
pub struct FileLog {
    storage: Arc<dyn StorageProvider>,
    log_dir: PathBuf,
}

impl std::fmt::Debug for FileLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLog")
            .field("storage", &self.storage.name())
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl FileLog {
    /// Create a log rooted at `log_dir`, storing snapshots in `storage`.
    ///
    /// Nothing is written until the first [`VersionLog::update`].
    pub fn new(storage: Arc<dyn StorageProvider>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            log_dir: log_dir.into(),
        }
    }

    fn identity_path(&self) -> PathBuf {
        self.log_dir.join(IDENTITY_FILE)
    }

    fn entries_path(&self) -> PathBuf {
        self.log_dir.join(ENTRIES_FILE)
    }

    /// Read every entry in order.
    pub async fn entries(&self) -> Result<Vec<LogEntry>, LogError> {
        Ok(read_lines(&self.entries_path())
            .await?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    /// Check signatures and the hash chain of every entry.
    ///
    /// Returns the number of entries verified.
    pub async fn verify(&self) -> Result<usize, LogError> {
        let Some(key) = self.load_key().await? else {
            return Ok(0);
        };
        let verifying = key.verifying_key();

        let lines = read_lines(&self.entries_path()).await?;
        let mut prev: Option<String> = None;
        for (expected_seq, (line, entry)) in lines.iter().enumerate() {
            if entry.body.seq != expected_seq as u64 {
                return Err(LogError::Corrupt(format!(
                    "entry {} has seq {}",
                    expected_seq, entry.body.seq
                )));
            }
            if entry.body.prev != prev {
                return Err(LogError::Corrupt(format!(
                    "entry {} does not chain to its predecessor",
                    expected_seq
                )));
            }
            verify_signature(&verifying, entry)?;
            prev = Some(line_hash(line));
        }
        Ok(lines.len())
    }

    async fn load_key(&self) -> Result<Option<SigningKey>, LogError> {
        let path = self.identity_path();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };
        let stored: StoredIdentity = serde_json::from_str(&contents)
            .map_err(|e| LogError::Corrupt(format!("{}: {}", path.display(), e)))?;
        let bytes: [u8; 64] = hex::decode(&stored.secret_key)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| LogError::Corrupt(format!("{}: bad secret key", path.display())))?;
        let key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| LogError::Corrupt(format!("{}: {}", path.display(), e)))?;
        Ok(Some(key))
    }

    async fn load_or_create_key(&self) -> Result<SigningKey, LogError> {
        if let Some(key) = self.load_key().await? {
            return Ok(key);
        }

        let seed: [u8; 32] = rand::random();
        let key = SigningKey::from_bytes(&seed);
        let stored = StoredIdentity {
            public_key: hex::encode(key.verifying_key().as_bytes()),
            secret_key: hex::encode(key.to_keypair_bytes()),
        };
        let encoded = serde_json::to_vec_pretty(&stored)
            .map_err(|e| LogError::Io(format!("failed to encode identity: {}", e)))?;
        let path = self.identity_path();
        tokio::fs::write(&path, encoded)
            .await
            .map_err(|e| io_error(&path, e))?;

        info!(public_key = %stored.public_key, "created new log identity");
        Ok(key)
    }
}

/// Build the identity triple for a signing key.
pub fn identity_for(key: &SigningKey) -> LogIdentity {
    let public_key = key.verifying_key().to_bytes().to_vec();
    let discovery_key = Sha256::new()
        .chain_update(DISCOVERY_CONTEXT)
        .chain_update(&public_key)
        .finalize()
        .to_vec();
    LogIdentity {
        public_key,
        secret_key: key.to_keypair_bytes().to_vec(),
        discovery_key,
    }
}

fn io_error(path: &Path, e: std::io::Error) -> LogError {
    LogError::Io(format!("{}: {}", path.display(), e))
}

fn line_hash(line: &str) -> String {
    hex::encode(Sha256::digest(line.as_bytes()))
}

fn verify_signature(key: &VerifyingKey, entry: &LogEntry) -> Result<(), LogError> {
    let corrupt = || LogError::Corrupt(format!("bad signature on entry {}", entry.body.seq));
    let bytes: [u8; 64] = hex::decode(&entry.signature)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(corrupt)?;
    let message = serde_json::to_vec(&entry.body).map_err(|_| corrupt())?;
    key.verify(&message, &Signature::from_bytes(&bytes))
        .map_err(|_| corrupt())
}

async fn read_lines(path: &Path) -> Result<Vec<(String, LogEntry)>, LogError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(path, e)),
    };
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(idx, line)| {
            serde_json::from_str::<LogEntry>(line)
                .map(|entry| (line.to_string(), entry))
                .map_err(|e| LogError::Corrupt(format!("line {}: {}", idx + 1, e)))
        })
        .collect()
}

#[async_trait]
impl VersionLog for FileLog {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn update(&self, record: VersionRecord) -> Result<LogIdentity, LogError> {
        let _lock = LogLock::acquire(&self.log_dir).map_err(|e| match e {
            LockError::AlreadyLocked => LogError::Locked,
            other => LogError::Io(other.to_string()),
        })?;

        let key = self.load_or_create_key().await?;
        let content = self
            .storage
            .put_dir(&record.snapshot_dir)
            .await
            .map_err(|e| LogError::Storage(e.to_string()))?;

        let entries_path = self.entries_path();
        let existing = read_lines(&entries_path).await?;
        let body = EntryBody {
            seq: existing.len() as u64,
            version: record.version,
            name: record.name,
            description: record.description,
            author: record.author,
            content,
            prev: existing.last().map(|(line, _)| line_hash(line)),
            timestamp: Utc::now(),
        };
        let message = serde_json::to_vec(&body)
            .map_err(|e| LogError::Io(format!("failed to encode entry: {}", e)))?;
        let entry = LogEntry {
            signature: hex::encode(key.sign(&message).to_bytes()),
            body,
        };
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| LogError::Io(format!("failed to encode entry: {}", e)))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&entries_path)
            .await
            .map_err(|e| io_error(&entries_path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| io_error(&entries_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error(&entries_path, e))?;

        debug!(
            seq = entry.body.seq,
            version = %entry.body.version,
            content = %entry.body.content,
            "appended log entry"
        );
        Ok(identity_for(&key))
    }

    async fn identity(&self) -> Result<Option<LogIdentity>, LogError> {
        Ok(self.load_key().await?.as_ref().map(identity_for))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::storage::BlobStore;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileLog) {
        let temp = TempDir::new().unwrap();
        let log_dir = temp.path().join("log");
        let storage = Arc::new(BlobStore::new(log_dir.join("blobs")));
        let log = FileLog::new(storage, log_dir);
        (temp, log)
    }

    fn record(temp: &TempDir, version: &str) -> VersionRecord {
        let dir = temp.path().join("data").join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("file.txt"), version).unwrap();
        VersionRecord {
            name: Some("demo".into()),
            description: None,
            author: Some("Ada".into()),
            version: version.into(),
            snapshot_dir: dir,
        }
    }

    #[tokio::test]
    async fn identity_absent_before_first_update() {
        let (_temp, log) = setup();
        assert!(log.identity().await.unwrap().is_none());
        assert_eq!(log.verify().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_returns_stable_identity() {
        let (temp, log) = setup();

        let first = log.update(record(&temp, "1.0.0")).await.unwrap();
        let second = log.update(record(&temp, "1.1.0")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.public_key.len(), 32);
        assert_eq!(first.secret_key.len(), 64);
        assert_eq!(first.discovery_key.len(), 32);
        assert_ne!(first.public_key, first.discovery_key);
        assert_eq!(log.identity().await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn entries_chain_and_verify() {
        let (temp, log) = setup();
        log.update(record(&temp, "1.0.0")).await.unwrap();
        log.update(record(&temp, "2.0.0")).await.unwrap();

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].body.seq, 0);
        assert!(entries[0].body.prev.is_none());
        assert_eq!(entries[1].body.seq, 1);
        assert!(entries[1].body.prev.is_some());
        assert_eq!(entries[1].body.version, "2.0.0");
        assert_eq!(entries[1].body.name.as_deref(), Some("demo"));
        assert_eq!(log.verify().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn tampered_entry_fails_verification() {
        let (temp, log) = setup();
        log.update(record(&temp, "1.0.0")).await.unwrap();

        let path = temp.path().join("log").join(ENTRIES_FILE);
        let tampered = fs::read_to_string(&path)
            .unwrap()
            .replace("1.0.0", "6.6.6");
        fs::write(&path, tampered).unwrap();

        assert!(matches!(log.verify().await, Err(LogError::Corrupt(_))));
    }

    #[tokio::test]
    async fn update_fails_while_locked() {
        let (temp, log) = setup();
        let _held = LogLock::acquire(&temp.path().join("log")).unwrap();

        let result = log.update(record(&temp, "1.0.0")).await;
        assert!(matches!(result, Err(LogError::Locked)));
    }

    #[tokio::test]
    async fn missing_snapshot_is_storage_error() {
        let (temp, log) = setup();
        let mut rec = record(&temp, "1.0.0");
        rec.snapshot_dir = temp.path().join("nope");

        let result = log.update(rec).await;
        assert!(matches!(result, Err(LogError::Storage(_))));
    }
}
