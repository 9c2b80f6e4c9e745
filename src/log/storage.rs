//! log::storage
//!
//! Content-addressed storage for snapshot directories.
//!
//! # Design
//!
//! A [`StorageProvider`] turns a directory into a single [`ContentId`]. The
//! bundled [`BlobStore`] keeps every file as a blob named by the SHA-256 of
//! its contents, then stores a JSON manifest of the tree as one more blob;
//! the manifest's hash is the directory's content id. Identical files across
//! versions are stored once.
//!
//! # Layout
//!
//! - `<root>/<hex>` - One blob per distinct content hash

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write blob '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("path '{0}' is not inside the stored directory")]
    OutsideRoot(PathBuf),

    #[error("failed to encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// SHA-256 content identifier, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Hash `bytes` into a content id.
    ///
    /// # Example
    ///
    /// ```
    /// use ipvl::log::storage::ContentId;
    ///
    /// let id = ContentId::of(b"");
    /// assert_eq!(
    ///     id.as_str(),
    ///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    /// );
    /// ```
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of a stored directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ManifestEntry {
    File {
        path: String,
        content: ContentId,
        size: u64,
    },
    Dir {
        path: String,
    },
    Symlink {
        path: String,
        target: String,
    },
}

impl ManifestEntry {
    fn path(&self) -> &str {
        match self {
            ManifestEntry::File { path, .. }
            | ManifestEntry::Dir { path }
            | ManifestEntry::Symlink { path, .. } => path,
        }
    }
}

/// The stored form of a directory: entries sorted by relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

/// Something that can store a directory and name it by content.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Store every file under `dir` and return the id of the whole tree.
    async fn put_dir(&self, dir: &Path) -> Result<ContentId, StorageError>;
}

/// Local content-addressed blob store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the blob for `id`.
    pub fn blob_path(&self, id: &ContentId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Store `bytes`, returning their id. Existing blobs are not rewritten.
    pub async fn put_bytes(&self, bytes: &[u8]) -> Result<ContentId, StorageError> {
        let id = ContentId::of(bytes);
        let path = self.blob_path(&id);
        let write_err = |e: std::io::Error| StorageError::Write {
            path: path.clone(),
            source: e,
        };

        if tokio::fs::try_exists(&path).await.map_err(write_err)? {
            return Ok(id);
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(write_err)?;
        let temp = path.with_extension("tmp");
        tokio::fs::write(&temp, bytes).await.map_err(write_err)?;
        tokio::fs::rename(&temp, &path).await.map_err(write_err)?;
        Ok(id)
    }

    /// Read a blob back.
    pub async fn get_bytes(&self, id: &ContentId) -> Result<Vec<u8>, StorageError> {
        let path = self.blob_path(id);
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::Read { path, source: e })
    }

    /// Read and decode a manifest blob.
    pub async fn get_manifest(&self, id: &ContentId) -> Result<Manifest, StorageError> {
        let bytes = self.get_bytes(id).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn collect(&self, dir: &Path) -> Result<Manifest, StorageError> {
        let mut entries = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let read_err = |e: std::io::Error| StorageError::Read {
                path: current.clone(),
                source: e,
            };
            let mut children = tokio::fs::read_dir(&current).await.map_err(read_err)?;
            while let Some(child) = children.next_entry().await.map_err(read_err)? {
                let path = child.path();
                let rel = relative(dir, &path)?;
                let file_type = child.file_type().await.map_err(read_err)?;

                if file_type.is_symlink() {
                    let target = tokio::fs::read_link(&path).await.map_err(read_err)?;
                    entries.push(ManifestEntry::Symlink {
                        path: rel,
                        target: target.to_string_lossy().into_owned(),
                    });
                } else if file_type.is_dir() {
                    entries.push(ManifestEntry::Dir { path: rel });
                    pending.push(path);
                } else {
                    let bytes = tokio::fs::read(&path).await.map_err(|e| StorageError::Read {
                        path: path.clone(),
                        source: e,
                    })?;
                    let content = self.put_bytes(&bytes).await?;
                    entries.push(ManifestEntry::File {
                        path: rel,
                        content,
                        size: bytes.len() as u64,
                    });
                }
            }
        }

        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(Manifest { entries })
    }
}

/// Relative path with `/` separators, independent of platform.
fn relative(root: &Path, path: &Path) -> Result<String, StorageError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| StorageError::OutsideRoot(path.to_path_buf()))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[async_trait]
impl StorageProvider for BlobStore {
    fn name(&self) -> &'static str {
        "blob"
    }

    async fn put_dir(&self, dir: &Path) -> Result<ContentId, StorageError> {
        let manifest = self.collect(dir).await?;
        let encoded = serde_json::to_vec(&manifest)?;
        self.put_bytes(&encoded).await
    }
}
