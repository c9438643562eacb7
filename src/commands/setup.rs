//! Commands: `setup` and `restore`.
use anyhow::Result;

use crate::context::Context;
use crate::setup;

/// Run the setup sequence against the OS package manager.
///
/// With `restore` set the run is labelled as a restore; the steps are the
/// same.
///
/// # Errors
///
/// Returns an error if bootstrapping, configuration reload or preset
/// selection fails.  Package failures are left to the summary.
pub fn run(ctx: &Context, restore: bool) -> Result<()> {
    let os_manager = ctx.registry.os_primary();
    ctx.log.info(&format!(
        "OS package manager: {} ({})",
        os_manager.name(),
        os_manager.exec_path().display()
    ));

    let report = if restore {
        setup::restore(ctx, os_manager)?
    } else {
        setup::setup(ctx, os_manager)?
    };

    if let Some(restored) = &report.restored {
        if restored.cloned {
            ctx.log.info("cloned dotfiles repository");
        }
        ctx.log
            .info(&format!("linked {} dotfile(s)", restored.linked.len()));
    }
    let installed: usize = report.installs.iter().map(|(_, s)| s.installed.len()).sum();
    let failed: usize = report.installs.iter().map(|(_, s)| s.failed.len()).sum();
    ctx.log.debug(&format!("{installed} installed, {failed} failed"));
    Ok(())
}
