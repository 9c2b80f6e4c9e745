//! engine
//!
//! Orchestrates the publication lifecycle for a project directory.
//!
//! # Architecture
//!
//! The engine is the only layer that mutates `.ipvl/`. Command handlers
//! translate CLI flags into a [`Context`] and call into [`release`]:
//!
//! ```text
//! Check preconditions -> Prepare control dir -> Clear version dir
//!     -> Resolve ignore rules -> Build snapshot -> Read metadata -> Log update
//! ```
//!
//! # Invariants
//!
//! - Precondition failures leave the filesystem untouched
//! - Ignore rules are resolved fresh for every release
//! - The version log only ever sees a finished snapshot
//!
//! # Example
//!
//! ```ignore
//! use ipvl::core::snapshot::CopyOptions;
//! use ipvl::engine::publish;
//! use ipvl::log::create_log;
//!
//! let report = publish(&path, "1.0.0", false, &CopyOptions::default(), |dir| {
//!     create_log("file", dir)
//! })
//! .await?;
//! println!("{}", report.identity.public_key_hex());
//! ```

pub mod release;

pub use release::{publish, release_version, update, ReleaseError, ReleaseReport};

use std::path::PathBuf;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Copy concurrency override (`--jobs`).
    pub jobs: Option<usize>,
    /// Log backend override (`--log-backend`).
    pub log_backend: Option<String>,
}

impl Context {
    /// Resolve a user-supplied path against the working directory override.
    pub fn resolve_path(&self, path: &std::path::Path) -> PathBuf {
        match &self.cwd {
            Some(cwd) if path.is_relative() => cwd.join(path),
            _ => path.to_path_buf(),
        }
    }
}
