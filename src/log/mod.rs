//! log
//!
//! Abstraction for the append-only version log.
//!
//! # Architecture
//!
//! The `VersionLog` trait is the boundary between the publication pipeline
//! and whatever stores published versions. The orchestrator builds a
//! finished snapshot, then hands a [`VersionRecord`] to [`VersionLog::update`]
//! and surfaces the returned [`LogIdentity`]. It never depends on a concrete
//! backend; commands obtain one through [`create_log`].
//!
//! # Modules
//!
//! - `traits`: Core `VersionLog` trait and record/identity types
//! - [`storage`]: Content-addressed storage providers
//! - [`file`]: Local signed append-only log
//! - [`lock`]: Exclusive lock on a log directory
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: Backend selection and creation

mod factory;
pub mod file;
pub mod lock;
pub mod mock;
pub mod storage;
mod traits;

pub use factory::{create_log, valid_backend_names, LogBackend, BLOBS_DIR};
pub use traits::*;
