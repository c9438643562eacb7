//! Command: save dotfiles to the remote repository.
use anyhow::Result;

use crate::cli::SaveOpts;
use crate::context::Context;
use crate::logging::TaskStatus;
use crate::setup;

/// Import the selected (or discovered) dotfiles, commit and push.
///
/// # Errors
///
/// Returns the first failing stage of the save pipeline.
pub fn run(ctx: &Context, opts: &SaveOpts) -> Result<()> {
    match setup::save(ctx, &opts.dotfiles, opts.message.as_deref()) {
        Ok(()) => {
            ctx.log.record_task("save dotfiles", TaskStatus::Ok, None);
            Ok(())
        }
        Err(e) => {
            ctx.log
                .record_task("save dotfiles", TaskStatus::Failed, Some(&e.to_string()));
            Err(e.into())
        }
    }
}
