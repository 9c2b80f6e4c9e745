//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Merges configuration with CLI overrides
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT touch `.ipvl/` directly.
//!
//! # Async Commands
//!
//! `publish` and `update` do their filesystem work on tokio. Each builds a
//! runtime and blocks on its async body, so dispatch stays synchronous.

mod completion;
mod publish;
mod update;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use publish::publish;
pub use update::update;

use crate::cli::args::Command;
use crate::core::config::Config;
use crate::core::snapshot::CopyOptions;
use crate::engine::{Context, ReleaseReport};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Publish {
            path,
            version,
            force,
        } => publish::publish(ctx, &path, &version, force),
        Command::Update { path, version } => update::update(ctx, &path, &version),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Settings shared by `publish` and `update` after merging config and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReleaseSettings {
    pub backend: String,
    pub copy: CopyOptions,
}

impl ReleaseSettings {
    /// Precedence: defaults < global config < CLI flags.
    pub fn resolve(ctx: &Context) -> Result<Self> {
        let config = Config::load().context("failed to load configuration")?;
        if let Some(path) = config.loaded_from() {
            output::debug(
                format!("using config {}", path.display()),
                Verbosity::from_flags(ctx.quiet, ctx.debug),
            );
        }
        Ok(Self::merge(ctx, &config))
    }

    fn merge(ctx: &Context, config: &Config) -> Self {
        Self {
            backend: ctx
                .log_backend
                .clone()
                .unwrap_or_else(|| config.log_backend().to_string()),
            copy: CopyOptions {
                concurrency: ctx.jobs.unwrap_or_else(|| config.copy_concurrency()),
            },
        }
    }
}

/// Print the outcome of a release.
pub(crate) fn report(report: &ReleaseReport, verb: &str, ctx: &Context) {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);

    output::success(format!("{} version {}", verb, report.version), verbosity);
    output::print(
        format!(
            "  {} -> {}",
            output::format_summary(&report.summary),
            report.snapshot_dir.display()
        ),
        verbosity,
    );
    output::debug(
        format!("ignore rules from {:?}", report.ignore_source),
        verbosity,
    );
    if report.metadata.name.is_none() {
        output::warn(
            "no package name found; the version was logged without metadata",
            verbosity,
        );
    }
    output::result(output::format_identity(&report.identity));
}
