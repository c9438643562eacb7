//! Console and log-file output plus the run summary.
//!
//! All output goes through [`tracing`]. [`init_subscriber`] installs two
//! layers: a terminal layer filtered by `--verbose` (and `RUST_LOG`), and a
//! file layer that always records debug output. [`Logger`] collects task
//! results for the end-of-run summary.

mod console;
mod fields;
mod file;
mod logger;
mod types;

pub use file::log_file_path;
pub use logger::Logger;
pub use types::{Log, TaskCounts, TaskEntry, TaskStatus};

/// Tracing target marking stage headers.
const STAGE_TARGET: &str = "devsetup::stage";

/// Install the global subscriber for a run of `command`.
///
/// Warnings and errors go to stderr, everything else to stdout. Call once,
/// before anything logs; later calls are ignored.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let terminal = fmt::layer()
        .event_format(console::ConsoleFormatter)
        .with_writer(
            std::io::stderr
                .with_max_level(tracing::Level::WARN)
                .and(std::io::stdout.with_min_level(tracing::Level::INFO)),
        )
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        );

    let log_file = log_file_path(command)
        .and_then(|path| file::FileLayer::open(&path, command).ok())
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    let _ = tracing_subscriber::registry()
        .with(terminal)
        .with(log_file)
        .try_init();
}

/// A [`Logger`] whose events land in a temporary log file through a
/// thread-local subscriber. Keep the guard alive for the whole test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;

    let tmp = tempfile::tempdir().expect("temp dir");
    let path = tmp.path().join("test.log");
    let layer = file::FileLayer::open(&path, "test").expect("log file");
    let subscriber = tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (Logger::with_log_file(Some(path)), tmp, guard)
}
