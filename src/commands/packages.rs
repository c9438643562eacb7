//! Commands acting on a single package manager: `install`, `uninstall`,
//! `update`, `upgrade`, `cleanup` and `managers`.
use anyhow::Result;

use super::select_manager;
use crate::cli::{ManagerOpts, PackageOpts};
use crate::context::Context;
use crate::error::PackageManagerError;
use crate::logging::TaskStatus;
use crate::managers::{self, Operation, PackageManager};
use crate::setup;

/// Install packages and record the successful ones in the manifest.
///
/// # Errors
///
/// Returns an error if no package is named or the configuration cannot be
/// written.
pub fn install(ctx: &Context, opts: &PackageOpts) -> Result<()> {
    let manager = select_manager(ctx, &opts.manager);
    require_packages(opts, Operation::Install)?;

    ctx.log.stage(&format!("Installing with {}", manager.name()));
    let summary = setup::install_packages(ctx, manager, &opts.packages);

    let added = setup::add_packages(ctx, manager.name(), &summary.installed)?;
    if !added.is_empty() {
        ctx.log.info(&format!(
            "added to manifest: {} {}",
            manager.name(),
            added.join(", ")
        ));
    }
    Ok(())
}

/// Uninstall packages and drop the successful ones from the manifest.
///
/// # Errors
///
/// Returns an error if no package is named or the configuration cannot be
/// written.
pub fn uninstall(ctx: &Context, opts: &PackageOpts) -> Result<()> {
    let manager = select_manager(ctx, &opts.manager);
    require_packages(opts, Operation::Uninstall)?;

    ctx.log.stage(&format!("Uninstalling with {}", manager.name()));
    let summary = setup::run_batch(ctx, manager, Operation::Uninstall, &opts.packages);

    let removed = setup::remove_packages(ctx, manager.name(), &summary.installed)?;
    if !removed.is_empty() {
        ctx.log.info(&format!(
            "removed from manifest: {} {}",
            manager.name(),
            removed.join(", ")
        ));
    }
    Ok(())
}

/// Refresh package metadata: the named packages, or everything.
///
/// # Errors
///
/// Infallible at the command level; failures are recorded as tasks.
pub fn update(ctx: &Context, opts: &PackageOpts) -> Result<()> {
    bulk_or_each(ctx, opts, Operation::Update, Operation::UpdateAll);
    Ok(())
}

/// Upgrade the named packages, or everything.
///
/// # Errors
///
/// Infallible at the command level; failures are recorded as tasks.
pub fn upgrade(ctx: &Context, opts: &PackageOpts) -> Result<()> {
    bulk_or_each(ctx, opts, Operation::Upgrade, Operation::UpgradeAll);
    Ok(())
}

/// Remove caches and unused dependencies.
///
/// # Errors
///
/// Infallible at the command level; failures are recorded as tasks.
pub fn cleanup(ctx: &Context, opts: &ManagerOpts) -> Result<()> {
    let manager = select_manager(ctx, opts);
    ctx.log.stage(&format!("Cleaning up {}", manager.name()));
    record(ctx, manager, Operation::Cleanup, manager.cleanup());
    Ok(())
}

/// List every manager with its path and state.
pub fn list_managers(ctx: &Context) {
    let primary = ctx.registry.resolve_os_primary().ok().map(|m| m.name());
    ctx.log.stage("Package managers");
    for manager in ctx.registry.all() {
        let state = if manager.is_installed() {
            "installed"
        } else {
            "missing"
        };
        let mut tags = Vec::new();
        if primary == Some(manager.name()) {
            tags.push("os");
        }
        if manager.is_extension() {
            tags.push("extension");
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        ctx.log.info(&format!(
            "{:<7} {:<24} {state}{tags}",
            manager.name(),
            manager.exec_path().display()
        ));
    }
}

fn require_packages(opts: &PackageOpts, op: Operation) -> Result<()> {
    if opts.packages.is_empty() {
        anyhow::bail!("{op}: no packages given");
    }
    Ok(())
}

fn bulk_or_each(ctx: &Context, opts: &PackageOpts, one: Operation, all: Operation) {
    let manager = select_manager(ctx, &opts.manager);
    if opts.packages.is_empty() {
        ctx.log.stage(&format!("Running {} {all}", manager.name()));
        record(ctx, manager, all, managers::dispatch(manager, all, None));
    } else {
        ctx.log.stage(&format!("Running {} {one}", manager.name()));
        setup::run_batch(ctx, manager, one, &opts.packages);
    }
}

fn record(
    ctx: &Context,
    manager: &dyn PackageManager,
    op: Operation,
    result: Result<(), PackageManagerError>,
) {
    let task = format!("{} {op}", manager.name());
    match result {
        Ok(()) => ctx.log.record_task(&task, TaskStatus::Ok, None),
        Err(e) if e.is_cancelled() => {
            ctx.log.record_task(&task, TaskStatus::Skipped, Some("cancelled"));
        }
        Err(e) => ctx.log.task_failed(&task, &e),
    }
}
