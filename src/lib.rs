//! ipvl - Publish versioned snapshots of a project directory
//!
//! ipvl copies a project tree, minus ignored paths, into
//! `.ipvl/data/<version>/` and records each version in an append-only log
//! whose keys identify the published project.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Publication orchestrator (`publish`, `update`)
//! - [`core`] - Workspace layout, ignore rules, snapshot copy, metadata, config
//! - [`log`] - Version log abstraction and backends
//! - [`ui`] - Operator-facing output
//!
//! # Correctness Invariants
//!
//! 1. The control directory never appears inside a snapshot
//! 2. Precondition failures leave the project untouched
//! 3. A version reaches the log only after its snapshot is complete

pub mod cli;
pub mod core;
pub mod engine;
pub mod log;
pub mod ui;
