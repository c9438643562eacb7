//! Task results, their tally, and the [`Log`] trait.
use std::fmt;

/// Result of one unit of work (a package install, a dotfiles step) for
/// summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Human-readable task name, e.g. `brew install jq`.
    pub name: String,
    /// Final status of the task.
    pub status: TaskStatus,
    /// Optional detail message (skip reason or error description).
    pub message: Option<String>,
}

impl TaskEntry {
    /// Build an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, status: TaskStatus, message: Option<&str>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.map(String::from),
        }
    }
}

/// Status of a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed successfully.
    Ok,
    /// Task was not attempted (location occupied, cancelled).
    Skipped,
    /// Task encountered an error and could not complete.
    Failed,
}

impl TaskStatus {
    /// Summary glyph.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Skipped => "○",
            Self::Failed => "✗",
        }
    }

    /// ANSI colour prefix used on the console.
    pub(super) const fn color(self) -> &'static str {
        match self {
            Self::Ok => "\x1b[32m",
            Self::Skipped => "\x1b[33m",
            Self::Failed => "\x1b[31m",
        }
    }
}

/// Per-status counts over a set of [`TaskEntry`] values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    /// Tasks that succeeded.
    pub ok: usize,
    /// Tasks that were skipped.
    pub skipped: usize,
    /// Tasks that failed.
    pub failed: usize,
}

impl TaskCounts {
    /// Count `entries` by status.
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a TaskEntry>) -> Self {
        entries
            .into_iter()
            .fold(Self::default(), |mut counts, entry| {
                match entry.status {
                    TaskStatus::Ok => counts.ok += 1,
                    TaskStatus::Skipped => counts.skipped += 1,
                    TaskStatus::Failed => counts.failed += 1,
                }
                counts
            })
    }

    /// Number of tasks counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.skipped + self.failed
    }
}

impl fmt::Display for TaskCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tasks: \x1b[32m{} ok\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[31m{} failed\x1b[0m",
            self.total(),
            self.ok,
            self.skipped,
            self.failed
        )
    }
}

/// Logging sink used by the orchestration code.
///
/// [`Logger`](super::Logger) is the production implementation; anything that
/// records tasks can stand in for it.
pub trait Log: Send + Sync + fmt::Debug {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a task result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);

    /// Log `error` and record `name` as failed with it.
    fn task_failed(&self, name: &str, error: &dyn fmt::Display) {
        let message = error.to_string();
        self.error(&message);
        self.record_task(name, TaskStatus::Failed, Some(&message));
    }
}
