//! Setup, restore and save orchestration.
//!
//! `setup` and `restore` run the same sequence:
//!
//! 1. bootstrap the OS package manager when its executable is missing (fatal);
//! 2. restore the dotfiles mirror (best-effort);
//! 3. reload the configuration, which the mirror may have changed (fatal);
//! 4. when the manifest is empty, pick a preset and save it (fatal);
//! 5. install every manifest entry, one package at a time (never fatal).
use crate::context::Context;
use crate::dotfiles::{RestoreReport, SaveRequest};
use crate::error::{ConfigError, SetupError};
use crate::logging::TaskStatus;
use crate::managers::{self, Operation, PackageManager};
use crate::presets;

/// Per-package outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    /// Packages the operation succeeded for.
    pub installed: Vec<String>,
    /// Packages whose operation failed.
    pub failed: Vec<String>,
    /// Packages not attempted because the run was cancelled.
    pub skipped: Vec<String>,
}

impl InstallSummary {
    /// Whether every package succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// What a setup run did.
#[derive(Debug, Default)]
pub struct SetupReport {
    /// Whether the OS package manager had to be bootstrapped.
    pub bootstrapped: bool,
    /// Result of the dotfiles restore, when it ran and succeeded.
    pub restored: Option<RestoreReport>,
    /// Preset chosen because the manifest was empty.
    pub preset: Option<&'static str>,
    /// Install outcome per manager, in manifest order.
    pub installs: Vec<(String, InstallSummary)>,
}

/// Bring a machine up to the configured state.
///
/// # Errors
///
/// * [`SetupError::Bootstrap`] when `os_manager` is missing and cannot be
///   set up;
/// * [`SetupError::Config`] when the configuration cannot be reloaded or the
///   chosen preset cannot be saved;
/// * [`SetupError::Prompt`] when no preset was selected.
///
/// Package failures are recorded in the report, never returned.
pub fn setup(ctx: &Context, os_manager: &dyn PackageManager) -> Result<SetupReport, SetupError> {
    let mut report = SetupReport::default();

    if !os_manager.is_installed() {
        ctx.log.stage(&format!("Bootstrapping {}", os_manager.name()));
        os_manager
            .setup()
            .map_err(|source| SetupError::Bootstrap {
                manager: os_manager.name().to_string(),
                source,
            })?;
        ctx.log
            .record_task(&format!("bootstrap {}", os_manager.name()), TaskStatus::Ok, None);
        report.bootstrapped = true;
    }

    report.restored = restore_dotfiles(ctx);

    ctx.reload_config()?;

    if ctx.config_read().packages.is_empty() {
        let preset = presets::choose(ctx.prompt.as_ref()).map_err(SetupError::Prompt)?;
        ctx.log.info(&format!("using preset '{}'", preset.name));
        ctx.update_config(|config| config.packages = preset.materialize(os_manager.name()))?;
        report.preset = Some(preset.name);
    }

    let manifest = ctx.config_read().packages.clone();
    for (name, packages) in manifest.iter() {
        if packages.is_empty() {
            continue;
        }
        if ctx.is_cancelled() {
            ctx.log.warn("cancelled, skipping remaining package managers");
            break;
        }
        let manager = ctx.registry.resolve(name);
        ctx.log.stage(&format!("Installing {} packages", manager.name()));
        let summary = install_packages(ctx, manager, packages);
        report.installs.push((manager.name().to_string(), summary));
    }

    Ok(report)
}

/// Same sequence as [`setup`]; named for the flow that starts from an
/// existing dotfiles repository.
///
/// # Errors
///
/// See [`setup`].
pub fn restore(ctx: &Context, os_manager: &dyn PackageManager) -> Result<SetupReport, SetupError> {
    setup(ctx, os_manager)
}

fn restore_dotfiles(ctx: &Context) -> Option<RestoreReport> {
    let (repository, dir) = {
        let config = ctx.config_read();
        (
            config.repository().map(String::from),
            config.dotfiles_dir(&ctx.home),
        )
    };
    if repository.is_none() {
        ctx.log.debug("no dotfiles repository configured");
        return None;
    }

    ctx.log.stage("Restoring dotfiles");
    match ctx.dotfiles.restore(repository.as_deref(), &dir) {
        Ok(Some(report)) => {
            for name in &report.occupied {
                ctx.log.record_task(
                    &format!("link {name}"),
                    TaskStatus::Skipped,
                    Some("location occupied"),
                );
            }
            ctx.log.record_task("restore dotfiles", TaskStatus::Ok, None);
            Some(report)
        }
        Ok(None) => None,
        Err(e) => {
            ctx.log.warn(&format!("dotfiles restore failed: {e}"));
            ctx.log
                .record_task("restore dotfiles", TaskStatus::Failed, Some(&e.to_string()));
            None
        }
    }
}

/// Install `names` with `manager`, one at a time.
///
/// Failures are logged and recorded; the loop carries on with the next
/// package.  Once the run is cancelled the remaining packages are skipped.
pub fn install_packages(
    ctx: &Context,
    manager: &dyn PackageManager,
    names: &[String],
) -> InstallSummary {
    run_batch(ctx, manager, Operation::Install, names)
}

/// Apply a per-package `op` to each of `names`, recording one task per
/// package.
pub fn run_batch(
    ctx: &Context,
    manager: &dyn PackageManager,
    op: Operation,
    names: &[String],
) -> InstallSummary {
    let mut summary = InstallSummary::default();
    for name in names {
        let task = format!("{} {op} {name}", manager.name());
        if ctx.is_cancelled() {
            ctx.log.record_task(&task, TaskStatus::Skipped, Some("cancelled"));
            summary.skipped.push(name.clone());
            continue;
        }
        match managers::dispatch(manager, op, Some(name)) {
            Ok(()) => {
                ctx.log.record_task(&task, TaskStatus::Ok, None);
                summary.installed.push(name.clone());
            }
            Err(e) if e.is_cancelled() => {
                ctx.log.record_task(&task, TaskStatus::Skipped, Some("cancelled"));
                summary.skipped.push(name.clone());
            }
            Err(e) => {
                ctx.log.task_failed(&task, &e);
                summary.failed.push(name.clone());
            }
        }
    }
    summary
}

/// Save the home directory's dotfiles to the configured repository.
///
/// The commit message is `message` when given, else the configured
/// `default_save_message`, else the synchronizer default.
///
/// # Errors
///
/// Returns [`SetupError::Dotfiles`] with the first failing stage.
pub fn save(ctx: &Context, selected: &[String], message: Option<&str>) -> Result<(), SetupError> {
    let (repository, dir, message) = {
        let config = ctx.config_read();
        (
            config.repository().map(String::from),
            config.dotfiles_dir(&ctx.home),
            config.save_message(message),
        )
    };

    ctx.log.stage("Saving dotfiles");
    ctx.log.debug(&format!("mirror: {}", dir.display()));
    ctx.dotfiles.save(&SaveRequest {
        repository: repository.as_deref(),
        dir: &dir,
        selected,
        message: &message,
    })?;
    ctx.log.info(&format!("dotfiles saved to {}", dir.display()));
    Ok(())
}

/// Append `names` to `manager`'s manifest entry and persist the
/// configuration.  Returns the names that were not already listed.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the configuration cannot be written.
pub fn add_packages(
    ctx: &Context,
    manager: &str,
    names: &[String],
) -> Result<Vec<String>, ConfigError> {
    ctx.update_config(|config| config.packages.add(manager, names.iter().cloned()))
}

/// Remove `names` from `manager`'s manifest entry and persist the
/// configuration.  Returns the names that were listed.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the configuration cannot be written.
pub fn remove_packages(
    ctx: &Context,
    manager: &str,
    names: &[String],
) -> Result<Vec<String>, ConfigError> {
    ctx.update_config(|config| config.packages.remove(manager, names))
}
