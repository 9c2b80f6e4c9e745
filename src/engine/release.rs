//! engine::release
//!
//! Publication orchestrator for `publish` and `update`.
//!
//! # Lifecycle
//!
//! ```text
//! UNPUBLISHED --publish--> VERSIONED --update--> VERSIONED
//!                          VERSIONED --publish --force--> VERSIONED (fresh log)
//! ```
//!
//! Both entry points share [`release_version`], which rebuilds one
//! `.ipvl/data/<version>/` directory and hands it to the version log.
//!
//! # Invariants
//!
//! - Every precondition is checked before anything under `.ipvl/` changes
//! - `update` never touches other versions' data or the log directory
//! - A failed ignore resolution aborts before copying starts
//! - A failed metadata read is logged and publication continues
//! - The log is only updated after the snapshot finished without error

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::ignore::{IgnoreError, IgnoreRules, IgnoreSource};
use crate::core::metadata::PackageMetadata;
use crate::core::paths::WorkspacePaths;
use crate::core::snapshot::{self, CopyOptions, SnapshotError, SnapshotSummary};
use crate::log::{LogError, LogIdentity, VersionLog, VersionRecord};

/// Errors from publishing or updating a project.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("path '{0}' does not exist")]
    PathMissing(PathBuf),

    #[error("path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error(
        "'{0}' is already published. Use `ipvl update` to add a version, \
         or `ipvl publish --force` to discard every existing version"
    )]
    AlreadyPublished(PathBuf),

    #[error("'{0}' has not been published yet. Run `ipvl publish` first")]
    NotPublished(PathBuf),

    #[error("invalid version '{version}': {reason}")]
    InvalidVersion {
        version: String,
        reason: &'static str,
    },

    #[error("failed to prepare '{path}': {source}")]
    WorkspaceIo { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Ignore(#[from] IgnoreError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("version log: {0}")]
    Log(#[from] LogError),
}

/// Outcome of a successful publish or update.
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    /// Version label that was released.
    pub version: String,
    /// Where the snapshot was written.
    pub snapshot_dir: PathBuf,
    /// What the snapshot contains.
    pub summary: SnapshotSummary,
    /// Which ignore file applied.
    pub ignore_source: IgnoreSource,
    /// Metadata handed to the log (fields absent if unreadable).
    pub metadata: PackageMetadata,
    /// Keys of the log after the update.
    pub identity: LogIdentity,
}

/// Check that `version` is usable as a single directory name under `.ipvl/data/`.
///
/// # Example
///
/// ```
/// use ipvl::engine::release::validate_version;
///
/// assert!(validate_version("1.0.0").is_ok());
/// assert!(validate_version("v2-beta").is_ok());
/// assert!(validate_version("../escape").is_err());
/// assert!(validate_version("").is_err());
/// ```
pub fn validate_version(version: &str) -> Result<(), ReleaseError> {
    let reason = if version.is_empty() {
        Some("must not be empty")
    } else if version == "." || version == ".." {
        Some("must not be '.' or '..'")
    } else if version.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if version.contains('\0') {
        Some("must not contain NUL bytes")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ReleaseError::InvalidVersion {
            version: version.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// First release of a project.
///
/// `open_log` receives the log directory once preconditions hold and must
/// return the backend to append to.
///
/// # Errors
///
/// - [`ReleaseError::PathMissing`] / [`ReleaseError::NotADirectory`]
/// - [`ReleaseError::InvalidVersion`]
/// - [`ReleaseError::AlreadyPublished`] if `.ipvl/` exists and `force` is off
/// - anything [`release_version`] returns
pub async fn publish<F>(
    path: &Path,
    version: &str,
    force: bool,
    options: &CopyOptions,
    open_log: F,
) -> Result<ReleaseReport, ReleaseError>
where
    F: FnOnce(&Path) -> Result<Box<dyn VersionLog>, LogError>,
{
    let paths = locate_project(path, version).await?;
    let published = path_exists(&paths.control_dir).await?;
    if published && !force {
        return Err(ReleaseError::AlreadyPublished(paths.project_root.clone()));
    }
    let log = open_log(&paths.log_dir)?;

    if published {
        info!(control_dir = %paths.control_dir.display(), "discarding existing publication");
        clear_path(&paths.control_dir).await?;
    }
    for dir in [&paths.control_dir, &paths.log_dir, &paths.data_dir] {
        create_dir(dir).await?;
    }

    info!(root = %paths.project_root.display(), version, backend = log.name(), "publishing");
    release_version(version, &paths, log.as_ref(), options).await
}

/// Add a version to an already published project.
///
/// # Errors
///
/// - [`ReleaseError::PathMissing`] / [`ReleaseError::NotADirectory`]
/// - [`ReleaseError::InvalidVersion`]
/// - [`ReleaseError::NotPublished`] if `.ipvl/` does not exist
/// - anything [`release_version`] returns
pub async fn update<F>(
    path: &Path,
    version: &str,
    options: &CopyOptions,
    open_log: F,
) -> Result<ReleaseReport, ReleaseError>
where
    F: FnOnce(&Path) -> Result<Box<dyn VersionLog>, LogError>,
{
    let paths = locate_project(path, version).await?;
    if !path_exists(&paths.control_dir).await? {
        return Err(ReleaseError::NotPublished(paths.project_root.clone()));
    }
    let log = open_log(&paths.log_dir)?;

    info!(root = %paths.project_root.display(), version, backend = log.name(), "updating");
    release_version(version, &paths, log.as_ref(), options).await
}

/// Rebuild `paths.version_data_dir` from the project tree and append it to `log`.
///
/// Reusing a version label replaces that version's snapshot.
pub async fn release_version(
    version: &str,
    paths: &WorkspacePaths,
    log: &dyn VersionLog,
    options: &CopyOptions,
) -> Result<ReleaseReport, ReleaseError> {
    clear_path(&paths.version_data_dir).await?;
    create_dir(&paths.version_data_dir).await?;

    let rules = IgnoreRules::resolve(paths).await?;
    let ignore_source = rules.source().clone();
    let summary = snapshot::build(paths, Arc::new(rules), options).await?;

    let metadata = match PackageMetadata::read(&paths.project_root).await {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(error = %e, "package metadata unavailable, publishing without it");
            PackageMetadata::default()
        }
    };

    let record = VersionRecord {
        name: metadata.name.clone(),
        description: metadata.description.clone(),
        author: metadata.author.clone(),
        version: version.to_string(),
        snapshot_dir: paths.version_data_dir.clone(),
    };
    let identity = log.update(record).await?;

    info!(
        version,
        entries = summary.entries,
        bytes = summary.bytes,
        "version released"
    );

    Ok(ReleaseReport {
        version: version.to_string(),
        snapshot_dir: paths.version_data_dir.clone(),
        summary,
        ignore_source,
        metadata,
        identity,
    })
}

/// Validate the inputs and compute the workspace layout from the
/// canonical project root.
async fn locate_project(path: &Path, version: &str) -> Result<WorkspacePaths, ReleaseError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ReleaseError::PathMissing(path.to_path_buf()));
        }
        Err(e) => return Err(workspace_io(path, e)),
    };
    if !meta.is_dir() {
        return Err(ReleaseError::NotADirectory(path.to_path_buf()));
    }
    validate_version(version)?;

    let root = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| workspace_io(path, e))?;
    debug!(root = %root.display(), "resolved project root");
    Ok(WorkspacePaths::new(root, version))
}

async fn path_exists(path: &Path) -> Result<bool, ReleaseError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| workspace_io(path, e))
}

async fn create_dir(path: &Path) -> Result<(), ReleaseError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| workspace_io(path, e))
}

/// Remove whatever is at `path`, if anything.
async fn clear_path(path: &Path) -> Result<(), ReleaseError> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(workspace_io(path, e)),
    };
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    result.map_err(|e| workspace_io(path, e))
}

fn workspace_io(path: &Path, source: io::Error) -> ReleaseError {
    ReleaseError::WorkspaceIo {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::mock::MockLog;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.js"), "module.exports = 1;\n").unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/util.js"), "exports.x = 2;\n").unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "demo", "description": "A demo", "author": "Ada"}"#,
        )
        .unwrap();
        dir
    }

    fn opener(log: &MockLog) -> impl FnOnce(&Path) -> Result<Box<dyn VersionLog>, LogError> {
        let log = log.clone();
        move |_: &Path| -> Result<Box<dyn VersionLog>, LogError> { Ok(Box::new(log)) }
    }

    fn listing(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn versions(root: &Path) -> BTreeSet<String> {
        listing(&root.join(".ipvl/data"))
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn publish_fresh_project() {
        let dir = project();
        let log = MockLog::new();

        let report = publish(dir.path(), "1.0.0", false, &CopyOptions::default(), opener(&log))
            .await
            .unwrap();

        let data = dir.path().join(".ipvl/data/1.0.0");
        assert!(dir.path().join(".ipvl/log").is_dir());
        assert_eq!(listing(&data), set(&["index.js", "lib", "package.json"]));
        assert!(data.join("lib/util.js").is_file());
        assert_eq!(report.summary.files, 3);
        assert_eq!(report.identity, log.identity().await.unwrap().unwrap());

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("demo"));
        assert_eq!(records[0].description.as_deref(), Some("A demo"));
        assert_eq!(records[0].author.as_deref(), Some("Ada"));
        assert_eq!(records[0].version, "1.0.0");
        assert_eq!(records[0].snapshot_dir, report.snapshot_dir);
    }

    #[tokio::test]
    async fn second_publish_without_force_mutates_nothing() {
        let dir = project();
        let log = MockLog::new();
        publish(dir.path(), "1.0.0", false, &CopyOptions::default(), opener(&log))
            .await
            .unwrap();

        let result =
            publish(dir.path(), "2.0.0", false, &CopyOptions::default(), opener(&log)).await;

        assert!(matches!(result, Err(ReleaseError::AlreadyPublished(_))));
        assert_eq!(versions(dir.path()), set(&["1.0.0"]));
        assert_eq!(log.records().len(), 1);
    }

    #[tokio::test]
    async fn forced_publish_discards_prior_versions() {
        let dir = project();
        let log = MockLog::new();
        let options = CopyOptions::default();
        publish(dir.path(), "1.0.0", false, &options, opener(&log))
            .await
            .unwrap();
        update(dir.path(), "1.1.0", &options, opener(&log))
            .await
            .unwrap();
        fs::write(dir.path().join(".ipvl/log/stale"), "x").unwrap();

        publish(dir.path(), "2.0.0", true, &options, opener(&log))
            .await
            .unwrap();

        assert_eq!(versions(dir.path()), set(&["2.0.0"]));
        assert!(!dir.path().join(".ipvl/log/stale").exists());
    }

    #[tokio::test]
    async fn update_keeps_existing_versions() {
        let dir = project();
        let log = MockLog::new();
        let options = CopyOptions::default();
        publish(dir.path(), "1.0.0", false, &options, opener(&log))
            .await
            .unwrap();
        fs::write(dir.path().join("new.js"), "// added later\n").unwrap();

        update(dir.path(), "2.0.0", &options, opener(&log))
            .await
            .unwrap();

        assert_eq!(versions(dir.path()), set(&["1.0.0", "2.0.0"]));
        assert!(!dir.path().join(".ipvl/data/1.0.0/new.js").exists());
        assert!(dir.path().join(".ipvl/data/2.0.0/new.js").is_file());
        assert_eq!(log.records().len(), 2);
    }

    #[tokio::test]
    async fn update_replaces_reused_version() {
        let dir = project();
        let log = MockLog::new();
        let options = CopyOptions::default();
        publish(dir.path(), "1.0.0", false, &options, opener(&log))
            .await
            .unwrap();
        fs::remove_file(dir.path().join("index.js")).unwrap();

        update(dir.path(), "1.0.0", &options, opener(&log))
            .await
            .unwrap();

        assert!(!dir.path().join(".ipvl/data/1.0.0/index.js").exists());
    }

    #[tokio::test]
    async fn directory_pattern_excludes_subtree() {
        let dir = project();
        fs::create_dir_all(dir.path().join("build/out")).unwrap();
        fs::write(dir.path().join("build/out/app.js"), "").unwrap();
        fs::write(dir.path().join(".ipvlignore"), "build/\n").unwrap();
        let log = MockLog::new();

        publish(dir.path(), "1.0.0", false, &CopyOptions::default(), opener(&log))
            .await
            .unwrap();

        let data = dir.path().join(".ipvl/data/1.0.0");
        assert!(!data.join("build").exists());
        assert!(data.join("index.js").is_file());
        assert!(data.join("lib/util.js").is_file());
    }

    #[tokio::test]
    async fn update_unpublished_fails_without_writing() {
        let dir = project();
        let log = MockLog::new();

        let result = update(dir.path(), "1.0.0", &CopyOptions::default(), opener(&log)).await;

        assert!(matches!(result, Err(ReleaseError::NotPublished(_))));
        assert!(!dir.path().join(".ipvl").exists());
        assert!(log.records().is_empty());
    }

    #[tokio::test]
    async fn missing_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let log = MockLog::new();

        let result = publish(&missing, "1.0.0", false, &CopyOptions::default(), opener(&log)).await;
        assert!(matches!(result, Err(ReleaseError::PathMissing(_))));

        let result = update(&missing, "1.0.0", &CopyOptions::default(), opener(&log)).await;
        assert!(matches!(result, Err(ReleaseError::PathMissing(_))));
    }

    #[tokio::test]
    async fn file_path_is_rejected() {
        let dir = project();
        let file = dir.path().join("index.js");
        let log = MockLog::new();

        let result = publish(&file, "1.0.0", false, &CopyOptions::default(), opener(&log)).await;

        assert!(matches!(result, Err(ReleaseError::NotADirectory(_))));
        assert!(!dir.path().join(".ipvl").exists());
    }

    #[tokio::test]
    async fn invalid_version_rejected_before_writing() {
        let dir = project();
        let log = MockLog::new();

        let result = publish(dir.path(), "../x", false, &CopyOptions::default(), opener(&log)).await;

        let err = result.unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidVersion { .. }));
        assert!(!dir.path().join(".ipvl").exists());
    }

    #[tokio::test]
    async fn unreadable_metadata_is_not_fatal() {
        let dir = project();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();
        let log = MockLog::new();

        let report = publish(dir.path(), "1.0.0", false, &CopyOptions::default(), opener(&log))
            .await
            .unwrap();

        assert_eq!(report.metadata, PackageMetadata::default());
        let records = log.records();
        assert!(records[0].name.is_none());
        assert!(records[0].author.is_none());
    }

    #[tokio::test]
    async fn mistyped_metadata_field_keeps_the_rest() {
        let dir = project();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"demo","description":["multi","line"],"author":"Ada"}"#,
        )
        .unwrap();
        let log = MockLog::new();

        publish(dir.path(), "1.0.0", false, &CopyOptions::default(), opener(&log))
            .await
            .unwrap();

        let records = log.records();
        assert_eq!(records[0].name.as_deref(), Some("demo"));
        assert!(records[0].description.is_none());
        assert_eq!(records[0].author.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn blocked_data_dir_is_workspace_error() {
        let dir = project();
        fs::create_dir_all(dir.path().join(".ipvl/log")).unwrap();
        fs::write(dir.path().join(".ipvl/data"), "not a directory").unwrap();
        let log = MockLog::new();

        let result = update(dir.path(), "1.0.0", &CopyOptions::default(), opener(&log)).await;

        assert!(matches!(result, Err(ReleaseError::WorkspaceIo { .. })));
        assert!(log.records().is_empty());
    }

    #[tokio::test]
    async fn ignore_failure_aborts_before_log_update() {
        let dir = project();
        fs::create_dir(dir.path().join(".ipvlignore")).unwrap();
        let log = MockLog::new();

        let result = publish(dir.path(), "1.0.0", false, &CopyOptions::default(), opener(&log)).await;

        assert!(matches!(result, Err(ReleaseError::Ignore(_))));
        assert!(log.records().is_empty());
        assert!(listing(&dir.path().join(".ipvl/data/1.0.0")).is_empty());
    }

    #[tokio::test]
    async fn log_failure_is_reported() {
        let dir = project();
        let log = MockLog::new().fail_with(LogError::Locked);

        let result = publish(dir.path(), "1.0.0", false, &CopyOptions::default(), opener(&log)).await;

        assert!(matches!(result, Err(ReleaseError::Log(LogError::Locked))));
    }

    #[tokio::test]
    async fn open_log_failure_leaves_project_untouched() {
        let dir = project();

        let result = publish(dir.path(), "1.0.0", false, &CopyOptions::default(), |_| {
            Err(LogError::NotImplemented("nope".into()))
        })
        .await;

        assert!(matches!(result, Err(ReleaseError::Log(_))));
        assert!(!dir.path().join(".ipvl").exists());
    }

    #[tokio::test]
    async fn relative_and_canonical_paths_agree() {
        let dir = project();
        let log = MockLog::new();
        let dotted = dir.path().join("lib/..");

        let report = publish(&dotted, "1.0.0", false, &CopyOptions::default(), opener(&log))
            .await
            .unwrap();

        let expected = fs::canonicalize(dir.path()).unwrap().join(".ipvl/data/1.0.0");
        assert_eq!(report.snapshot_dir, expected);
    }
}
