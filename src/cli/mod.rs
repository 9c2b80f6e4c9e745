//! cli
//!
//! Command-line interface layer for ipvl.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the diagnostic subscriber
//! - Delegate to command handlers
//! - Does NOT touch `.ipvl/` directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::engine;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        jobs: cli.jobs.map(usize::from),
        log_backend: cli.log_backend.clone(),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install a stderr subscriber filtered by `RUST_LOG`, or by `--debug` when
/// `RUST_LOG` is unset.
fn init_tracing(debug: bool) {
    let default = if debug { "warn,ipvl=debug" } else { "warn" };
    // Ignore a second install attempt; a subscriber is already active.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
