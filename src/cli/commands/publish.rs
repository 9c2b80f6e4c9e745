//! cli::commands::publish
//!
//! Publish the first version of a project.
//!
//! # Example
//!
//! ```bash
//! # First release
//! ipvl publish ./my-app 1.0.0
//!
//! # Start over with a fresh log
//! ipvl publish ./my-app 1.0.0 --force
//! ```

use std::path::Path;

use crate::engine::{release, Context};
use crate::log::create_log;
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

use super::ReleaseSettings;

/// Publish `path` as `version`, creating its version log.
pub fn publish(ctx: &Context, path: &Path, version: &str, force: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(publish_async(ctx, path, version, force))
}

async fn publish_async(ctx: &Context, path: &Path, version: &str, force: bool) -> Result<()> {
    let settings = ReleaseSettings::resolve(ctx)?;
    let path = ctx.resolve_path(path);

    if force {
        output::debug(
            "--force: existing versions and log keys will be discarded",
            Verbosity::from_flags(ctx.quiet, ctx.debug),
        );
    }

    let backend = settings.backend.as_str();
    let report = release::publish(&path, version, force, &settings.copy, |log_dir| {
        create_log(backend, log_dir)
    })
    .await
    .with_context(|| format!("failed to publish '{}'", path.display()))?;

    super::report(&report, "Published", ctx);
    Ok(())
}
