//! cli::commands::update
//!
//! Add a version to a published project.

use std::path::Path;

use crate::engine::{release, Context};
use crate::log::create_log;
use anyhow::{Context as _, Result};

use super::ReleaseSettings;

/// Snapshot `path` as `version` and append it to the existing log.
pub fn update(ctx: &Context, path: &Path, version: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(update_async(ctx, path, version))
}

async fn update_async(ctx: &Context, path: &Path, version: &str) -> Result<()> {
    let settings = ReleaseSettings::resolve(ctx)?;
    let path = ctx.resolve_path(path);

    let backend = settings.backend.as_str();
    let report = release::update(&path, version, &settings.copy, |log_dir| {
        create_log(backend, log_dir)
    })
    .await
    .with_context(|| format!("failed to update '{}'", path.display()))?;

    super::report(&report, "Updated", ctx);
    Ok(())
}
