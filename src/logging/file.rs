//! The persistent per-command log file.
//!
//! Every run of `devsetup <command>` writes `<cache>/devsetup/<command>.log`.
//! The previous run's file is kept as `<command>.log.1` so a failed run can be
//! compared with the one before it.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::layer::{Context, Layer};

use super::STAGE_TARGET;
use super::fields::EventFields;

/// Directory holding the log files: `$XDG_CACHE_HOME/devsetup`, else
/// `~/.cache/devsetup`. Created on demand.
fn log_dir() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CACHE_HOME") {
        Some(cache) if !cache.is_empty() => PathBuf::from(cache),
        _ => std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join(".cache"),
    };
    let dir = base.join("devsetup");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Path of the log file for `command`, or `None` when the cache directory
/// cannot be created.
#[must_use]
pub fn log_file_path(command: &str) -> Option<PathBuf> {
    log_dir().map(|dir| dir.join(format!("{command}.log")))
}

/// `<path>.1`, where the previous run's log is kept.
fn previous_run(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

/// Remove ANSI CSI sequences (colours, cursor movement) and bare `ESC x`
/// pairs.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            let _ = chars.by_ref().find(|inner| ('@'..='~').contains(inner));
        }
    }
    out
}

/// Layer appending every event at `DEBUG` and above to the log file,
/// timestamped, with structured fields and without colour codes.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<File>,
}

impl FileLayer {
    /// Rotate any existing file at `path` to `<path>.1`, start a fresh one
    /// with a run header, and return a layer appending to it.
    pub(super) fn open(path: &Path, command: &str) -> io::Result<Self> {
        if path.exists() {
            fs::rename(path, previous_run(path))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        writeln!(
            file,
            "# devsetup {} {command} started {}",
            crate::commands::version::version(),
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        )?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn line(event: &tracing::Event<'_>) -> String {
        let meta = event.metadata();
        let fields = EventFields::of(event);
        let msg = strip_ansi(&fields.message);
        let ts = chrono::Utc::now().format("%H:%M:%S%.3f");

        if *meta.level() == Level::INFO && meta.target() == STAGE_TARGET {
            return format!("{ts} ==> {msg}");
        }
        let tag = match *meta.level() {
            Level::ERROR => "ERROR",
            Level::WARN => "WARN ",
            Level::INFO => "INFO ",
            _ => "DEBUG",
        };
        format!("{ts} {tag} {msg}{}", fields.suffix())
    }
}

impl<S: tracing::Subscriber> Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let line = Self::line(event);
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
        }
    }
}
