//! core
//!
//! Core domain types and operations for ipvl.
//!
//! # Modules
//!
//! - [`paths`] - Centralized workspace layout for a (project, version) pair
//! - [`ignore`] - Ignore rule loading and glob expansion
//! - [`snapshot`] - Filtered concurrent copy of the project tree
//! - [`metadata`] - `package.json` metadata extraction
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Path layout is computed in one place
//! - Exclusion sets are recomputed per call, never cached
//! - Nothing here talks to the version log

pub mod config;
pub mod ignore;
pub mod metadata;
pub mod paths;
pub mod snapshot;
