// Shared helpers for integration tests.
//
// Provides a recording executor, a scripted preset prompt and a fluent
// builder that wires a `Context` around an in-memory filesystem, so each
// integration test can set up an isolated machine without touching the real
// home directory or running real package managers.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use devsetup_cli::context::Context;
use devsetup_cli::error::ExecError;
use devsetup_cli::exec::{ExecCommand, Executor, StdioMode};
use devsetup_cli::logging::Logger;
use devsetup_cli::operations::MemoryFileSystemOps;
use devsetup_cli::platform::{Os, Platform};
use devsetup_cli::presets::Prompt;

pub const HOME: &str = "/home/dev";
pub const CONFIG: &str = "/etc/devsetup/config.toml";
pub const MIRROR: &str = "/home/dev/src/dotfiles";

/// Records every command and fails those whose label contains one of the
/// configured substrings.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<ExecCommand>>,
    fail_on: Vec<String>,
}

impl RecordingExecutor {
    pub fn failing_on(patterns: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: patterns.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    pub fn commands(&self) -> Vec<ExecCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.commands().iter().map(ExecCommand::label).collect()
    }

    pub fn modes(&self) -> Vec<StdioMode> {
        self.commands().iter().map(|c| c.stdio).collect()
    }

    /// Labels of `git` invocations only.
    pub fn git_labels(&self) -> Vec<String> {
        self.labels()
            .into_iter()
            .filter(|l| l.starts_with("git "))
            .collect()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, cmd: &ExecCommand) -> Result<(), ExecError> {
        self.calls.lock().unwrap().push(cmd.clone());
        let label = cmd.label();
        if self.fail_on.iter().any(|p| label.contains(p.as_str())) {
            return Err(ExecError::Failed {
                command: label,
                code: Some(1),
            });
        }
        Ok(())
    }
}

/// Prompt that answers with a fixed menu index, or fails when `None`.
#[derive(Debug)]
pub struct ScriptedPrompt(pub Option<usize>);

impl Prompt for ScriptedPrompt {
    fn select(&self, _prompt: &str, _options: &[String]) -> io::Result<usize> {
        self.0
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no answer"))
    }
}

/// A wired-up context plus handles on its test doubles.
pub struct TestMachine {
    pub ctx: Context,
    pub log: Arc<Logger>,
    pub exec: Arc<RecordingExecutor>,
    pub fs: Arc<MemoryFileSystemOps>,
}

/// Fluent builder for a [`TestMachine`].
pub struct MachineBuilder {
    os: Os,
    fs: MemoryFileSystemOps,
    exec: RecordingExecutor,
    answer: Option<usize>,
}

impl MachineBuilder {
    pub fn new(os: Os) -> Self {
        Self {
            os,
            fs: MemoryFileSystemOps::new().with_dir(HOME),
            exec: RecordingExecutor::default(),
            answer: None,
        }
    }

    /// Mark executables as present.
    pub fn installed(mut self, paths: &[&str]) -> Self {
        for path in paths {
            self.fs = self.fs.with_file(path, "");
        }
        self
    }

    /// Write `config.toml` with `contents`.
    pub fn config(mut self, contents: &str) -> Self {
        self.fs = self.fs.with_file(CONFIG, contents);
        self
    }

    /// Place a file in the home directory.
    pub fn home_file(mut self, name: &str, contents: &str) -> Self {
        self.fs = self.fs.with_file(PathBuf::from(HOME).join(name), contents);
        self
    }

    /// Adjust the filesystem directly.
    pub fn with_fs(mut self, f: impl FnOnce(MemoryFileSystemOps) -> MemoryFileSystemOps) -> Self {
        self.fs = f(self.fs);
        self
    }

    pub fn failing_on(mut self, patterns: &[&str]) -> Self {
        self.exec = RecordingExecutor::failing_on(patterns);
        self
    }

    pub fn answer(mut self, index: usize) -> Self {
        self.answer = Some(index);
        self
    }

    pub fn build(self) -> TestMachine {
        let log = Arc::new(Logger::with_log_file(None));
        let exec = Arc::new(self.exec);
        let fs = Arc::new(self.fs);
        let ctx = Context::new(
            PathBuf::from(HOME),
            PathBuf::from(CONFIG),
            Platform::new(self.os),
            Arc::clone(&log) as _,
            Arc::clone(&exec) as _,
            Arc::clone(&fs) as _,
        )
        .expect("context should build")
        .with_prompt(Box::new(ScriptedPrompt(self.answer)));
        TestMachine { ctx, log, exec, fs }
    }
}
