//! core::paths
//!
//! Centralized path routing for the ipvl workspace.
//!
//! # Architecture
//!
//! Every ipvl storage location is computed here so that `publish` and
//! `update` always agree on the layout. No code outside this module should
//! compute `*.join(".ipvl")` paths.
//!
//! # Storage Layout
//!
//! Relative to the project root:
//! - `.ipvl/` - Control root
//! - `.ipvl/log/` - Storage root handed to the version log
//! - `.ipvl/data/<version>/` - Filtered snapshot for one version
//! - `.ipvlignore` - Optional project-specific ignore file
//! - `.gitignore` - Fallback ignore file, consulted only without `.ipvlignore`
//!
//! # Example
//!
//! ```
//! use ipvl::core::paths::WorkspacePaths;
//! use std::path::PathBuf;
//!
//! let paths = WorkspacePaths::new("/project", "1.0.0");
//!
//! assert_eq!(
//!     paths.version_data_dir,
//!     PathBuf::from("/project/.ipvl/data/1.0.0")
//! );
//! ```

use std::path::PathBuf;

/// Name of the control directory under the project root.
pub const CONTROL_DIR_NAME: &str = ".ipvl";

/// Name of the project-specific ignore file.
pub const PROJECT_IGNORE_FILE: &str = ".ipvlignore";

/// Name of the fallback ignore file.
pub const FALLBACK_IGNORE_FILE: &str = ".gitignore";

/// Canonical workspace paths for a (project root, version) pair.
///
/// Derived by pure path joining; never persisted and recomputed on every
/// invocation.
///
/// # Invariants
///
/// - Every path is a subpath of `project_root`
/// - `control_dir` is always excluded from snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    /// The project directory being published.
    pub project_root: PathBuf,
    /// `<root>/.ipvl`
    pub control_dir: PathBuf,
    /// `<root>/.ipvl/log`
    pub log_dir: PathBuf,
    /// `<root>/.ipvl/data`
    pub data_dir: PathBuf,
    /// `<root>/.ipvl/data/<version>`
    pub version_data_dir: PathBuf,
    /// `<root>/.ipvlignore`
    pub project_ignore_path: PathBuf,
    /// `<root>/.gitignore`
    pub fallback_ignore_path: PathBuf,
}

impl WorkspacePaths {
    /// Compute the workspace layout for `project_root` and `version`.
    ///
    /// # Example
    ///
    /// ```
    /// use ipvl::core::paths::WorkspacePaths;
    /// use std::path::PathBuf;
    ///
    /// let paths = WorkspacePaths::new("/project", "2.0.0");
    /// assert_eq!(paths.control_dir, PathBuf::from("/project/.ipvl"));
    /// assert_eq!(paths.log_dir, PathBuf::from("/project/.ipvl/log"));
    /// assert_eq!(paths.fallback_ignore_path, PathBuf::from("/project/.gitignore"));
    /// ```
    pub fn new(project_root: impl Into<PathBuf>, version: &str) -> Self {
        let project_root = project_root.into();
        let control_dir = project_root.join(CONTROL_DIR_NAME);
        let log_dir = control_dir.join("log");
        let data_dir = control_dir.join("data");
        let version_data_dir = data_dir.join(version);

        Self {
            project_ignore_path: project_root.join(PROJECT_IGNORE_FILE),
            fallback_ignore_path: project_root.join(FALLBACK_IGNORE_FILE),
            project_root,
            control_dir,
            log_dir,
            data_dir,
            version_data_dir,
        }
    }
}
