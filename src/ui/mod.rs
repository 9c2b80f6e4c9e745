//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! Everything the operator reads on the terminal goes through this module.
//! Internal diagnostics use `tracing` instead and are written to stderr by
//! the subscriber installed in `main`.

pub mod output;
