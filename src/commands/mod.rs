//! Subcommand handlers and the production context they run in.

pub mod packages;
pub mod save;
pub mod setup;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, ManagerOpts};
use crate::config;
use crate::context::Context;
use crate::exec::{CancelToken, SystemExecutor};
use crate::logging::{Log as _, Logger};
use crate::managers::PackageManager;
use crate::operations::SystemFileSystemOps;
use crate::platform::Platform;

/// Resolve the user's home directory from the environment.
///
/// # Errors
///
/// Returns an error if neither `HOME` nor (on Windows) `USERPROFILE` is set.
pub fn home_dir() -> Result<PathBuf> {
    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .map_err(|_| {
                anyhow::anyhow!("neither USERPROFILE nor HOME environment variable is set")
            })?
    } else {
        std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?
    };
    Ok(PathBuf::from(home))
}

/// Build the production context: real filesystem, real processes, and the
/// configuration at `--config` or its default location.
///
/// # Errors
///
/// Returns an error if the home directory is unknown or the configuration
/// cannot be loaded.
pub fn build_context(global: &GlobalOpts, log: Arc<Logger>, cancel: CancelToken) -> Result<Context> {
    let home = home_dir()?;
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(|| config::default_path(&home));
    let platform = Platform::detect();

    log.debug(&format!("platform: {}", platform.os));
    log.debug(&format!("config: {}", config_path.display()));

    let ctx = Context::new(
        home,
        config_path,
        platform,
        log,
        Arc::new(SystemExecutor::new(cancel.clone())),
        Arc::new(SystemFileSystemOps),
    )
    .context("loading configuration")?;
    Ok(ctx.with_cancel(cancel))
}

/// The manager named by `--manager`, or the OS package manager.
#[must_use]
pub fn select_manager<'a>(ctx: &'a Context, opts: &ManagerOpts) -> &'a dyn PackageManager {
    opts.manager
        .as_deref()
        .map_or_else(|| ctx.registry.os_primary(), |name| ctx.registry.resolve(name))
}

/// Print the summary and bail if any task failed.
///
/// # Errors
///
/// Returns an error if one or more tasks recorded a failure.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(())
}
