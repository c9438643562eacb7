//! [`Logger`]: the production [`Log`] sink.
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::STAGE_TARGET;
use super::file::log_file_path;
use super::types::{Log, TaskCounts, TaskEntry, TaskStatus};

/// Emits messages through [`tracing`] and keeps every recorded task for the
/// summary printed at the end of a run.
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for a run of `command`; the summary points at that command's
    /// log file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Logger whose summary mentions `log_file`, if any.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Where this run's log file is written, if anywhere.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the tasks recorded so far, in order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.tasks().clone()
    }

    /// Per-status totals of the recorded tasks.
    #[must_use]
    pub fn counts(&self) -> TaskCounts {
        TaskCounts::tally(self.tasks().iter())
    }

    /// Number of tasks recorded as failed.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.counts().failed
    }

    /// Print one line per recorded task, then the totals and the log file
    /// location. Prints nothing when no task was recorded.
    #[allow(clippy::print_stdout)]
    pub fn print_summary(&self) {
        let tasks = self.task_entries();
        if tasks.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");
        for task in &tasks {
            let detail = task
                .message
                .as_deref()
                .map(|msg| format!(" ({msg})"))
                .unwrap_or_default();
            tracing::info!(
                "{}{} {}{detail}\x1b[0m",
                task.status.color(),
                task.status.icon(),
                task.name
            );
        }
        println!();
        tracing::info!("{}", TaskCounts::tally(&tasks));

        if let Some(path) = self.log_path() {
            tracing::info!("\x1b[2mlog: {}\x1b[0m", path.display());
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.tasks().push(TaskEntry::new(name, status, message));
    }
}
