//! core::snapshot
//!
//! Filtered copy of a project tree into a version's data directory.
//!
//! # Design
//!
//! The top-level entries of the project root are copied concurrently through
//! a bounded worker pool: every entry gets a task in a [`JoinSet`], and a
//! [`Semaphore`] caps how many copy at once. There is no ordering between
//! entries. The build settles every task before returning, then reports the
//! first failure, if any.
//!
//! # Invariants
//!
//! - Excluded paths are never copied, at any depth
//! - The control directory is never copied
//! - A failed build leaves already-copied entries on disk; the caller clears
//!   the version directory before the next attempt

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, trace};

use crate::core::ignore::IgnoreRules;
use crate::core::paths::WorkspacePaths;

/// Default number of top-level entries copied at once.
pub const DEFAULT_COPY_CONCURRENCY: usize = 16;

/// Errors from building a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The project root could not be listed.
    #[error("failed to list '{path}': {message}")]
    List { path: PathBuf, message: String },

    /// A file, directory or link could not be copied.
    #[error("failed to copy '{path}': {source}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A copy task panicked or was cancelled.
    #[error("copy task failed: {0}")]
    Task(String),
}

/// Options for the snapshot copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    /// Maximum number of top-level entries copied at once (at least 1).
    pub concurrency: usize,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_COPY_CONCURRENCY,
        }
    }
}

/// Counts of what a snapshot build copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Top-level entries copied.
    pub entries: usize,
    /// Regular files copied, at any depth.
    pub files: usize,
    /// Directories created, at any depth.
    pub directories: usize,
    /// Symlinks recreated.
    pub symlinks: usize,
    /// Bytes of file content copied.
    pub bytes: u64,
}

impl SnapshotSummary {
    fn merge(&mut self, other: SnapshotSummary) {
        self.entries += other.entries;
        self.files += other.files;
        self.directories += other.directories;
        self.symlinks += other.symlinks;
        self.bytes += other.bytes;
    }
}

/// Copy the project tree into `paths.version_data_dir`, skipping every path
/// excluded by `rules`.
///
/// # Errors
///
/// Returns the first [`SnapshotError`] once every copy task has settled.
pub async fn build(
    paths: &WorkspacePaths,
    rules: Arc<IgnoreRules>,
    options: &CopyOptions,
) -> Result<SnapshotSummary, SnapshotError> {
    let dest = paths.version_data_dir.clone();
    tokio::fs::create_dir_all(&dest)
        .await
        .map_err(|e| SnapshotError::Copy {
            path: dest.clone(),
            source: e,
        })?;

    let entries: Vec<PathBuf> = list_top_level(&paths.project_root)
        .await?
        .into_iter()
        .filter(|entry| {
            let excluded = rules.is_excluded(entry);
            if excluded {
                trace!(path = %entry.display(), "skipping excluded entry");
            }
            !excluded
        })
        .collect();

    let copied = run_bounded(entries, options.concurrency, |entry| {
        let rules = Arc::clone(&rules);
        let dest = dest.clone();
        async move { copy_entry(entry, &dest, &rules).await }
    })
    .await?;

    let mut summary = SnapshotSummary::default();
    for entry in copied {
        summary.merge(entry);
    }
    debug!(
        entries = summary.entries,
        files = summary.files,
        bytes = summary.bytes,
        dest = %dest.display(),
        "snapshot built"
    );
    Ok(summary)
}

/// Run `work` for every item with at most `limit` futures in flight.
///
/// Every task settles before this returns; the first failure wins.
async fn run_bounded<I, F, Fut, T>(
    items: I,
    limit: usize,
    work: F,
) -> Result<Vec<T>, SnapshotError>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, SnapshotError>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let job = work(item);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SnapshotError::Task(e.to_string()))?;
            job.await
        });
    }

    let mut done = Vec::new();
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| SnapshotError::Task(e.to_string()));
        match result.and_then(|r| r) {
            Ok(output) => done.push(output),
            Err(e) => {
                debug!(error = %e, "snapshot entry failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(done),
    }
}

/// List direct entries of `root` with a `*` wildcard, hidden entries included.
async fn list_top_level(root: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, SnapshotError> {
        let expr = format!(
            "{}/*",
            Pattern::escape(&root.to_string_lossy()).trim_end_matches('/')
        );
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let list_err = |message: String| SnapshotError::List {
            path: root.clone(),
            message,
        };
        glob::glob_with(&expr, options)
            .map_err(|e| list_err(e.msg.to_string()))?
            .map(|entry| entry.map_err(|e| list_err(e.to_string())))
            .collect()
    })
    .await
    .map_err(|e| SnapshotError::Task(e.to_string()))?
}

/// Recursively copy one top-level entry into `dest_root`, keeping its base
/// name and re-checking the exclusion set for every descendant.
async fn copy_entry(
    src: PathBuf,
    dest_root: &Path,
    rules: &IgnoreRules,
) -> Result<SnapshotSummary, SnapshotError> {
    let Some(name) = src.file_name() else {
        return Ok(SnapshotSummary::default());
    };
    let mut summary = SnapshotSummary {
        entries: 1,
        ..Default::default()
    };
    let mut pending = vec![(src.clone(), dest_root.join(name))];

    while let Some((from, to)) = pending.pop() {
        if rules.is_excluded(&from) {
            continue;
        }
        let copy_err = |e: std::io::Error| SnapshotError::Copy {
            path: from.clone(),
            source: e,
        };

        let file_type = tokio::fs::symlink_metadata(&from)
            .await
            .map_err(copy_err)?
            .file_type();

        if file_type.is_symlink() {
            copy_symlink(&from, &to).await.map_err(copy_err)?;
            summary.symlinks += 1;
        } else if file_type.is_dir() {
            tokio::fs::create_dir_all(&to).await.map_err(copy_err)?;
            summary.directories += 1;
            let mut children = tokio::fs::read_dir(&from).await.map_err(copy_err)?;
            while let Some(child) = children.next_entry().await.map_err(copy_err)? {
                pending.push((child.path(), to.join(child.file_name())));
            }
        } else {
            summary.bytes += tokio::fs::copy(&from, &to).await.map_err(copy_err)?;
            summary.files += 1;
        }
    }

    Ok(summary)
}

#[cfg(unix)]
async fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    let target = tokio::fs::read_link(from).await?;
    tokio::fs::symlink(target, to).await
}

#[cfg(not(unix))]
async fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    tokio::fs::copy(from, to).await.map(|_| ())
}
