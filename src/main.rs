//! `devsetup` binary entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use devsetup_cli::cli::{self, Command};
use devsetup_cli::commands;
use devsetup_cli::exec::CancelToken;
use devsetup_cli::logging::{self, Log as _, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    if matches!(args.command, Command::Version) {
        commands::version::run();
        return Ok(());
    }

    let name = args.command.name();
    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(Logger::new(name));
    log.info(&format!("devsetup {}", commands::version::version()));

    let cancel = CancelToken::new();
    let handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        log.warn(&format!("could not install Ctrl-C handler: {e}"));
    }

    let ctx = commands::build_context(&args.global, Arc::clone(&log), cancel)?;

    let outcome = match &args.command {
        Command::Setup => commands::setup::run(&ctx, false),
        Command::Restore => commands::setup::run(&ctx, true),
        Command::Save(opts) => commands::save::run(&ctx, opts),
        Command::Install(opts) => commands::packages::install(&ctx, opts),
        Command::Uninstall(opts) => commands::packages::uninstall(&ctx, opts),
        Command::Update(opts) => commands::packages::update(&ctx, opts),
        Command::Upgrade(opts) => commands::packages::upgrade(&ctx, opts),
        Command::Cleanup(opts) => commands::packages::cleanup(&ctx, opts),
        Command::Managers => {
            commands::packages::list_managers(&ctx);
            Ok(())
        }
        Command::Version => Ok(()),
    };

    let finished = commands::finish(&log);
    outcome.and(finished)
}
