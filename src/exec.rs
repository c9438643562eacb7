//! Process execution: streamed and interactive subprocess runs.
//!
//! Every external tool (package managers, git) is launched through the
//! [`Executor`] trait so that tests can substitute a recording mock.
//! [`SystemExecutor`] is the production implementation.
use std::io::{self, BufRead as _, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::ExecError;

/// How often a running child is polled for exit or cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Stdout is piped and echoed line by line; stdin/stderr are inherited.
    #[default]
    Streamed,
    /// All three streams are attached directly to the terminal.
    Interactive,
}

/// A single external command invocation.
///
/// Built fresh for every call and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand {
    /// Program to launch (absolute path or bare name).
    pub program: PathBuf,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory, or the current directory when `None`.
    pub dir: Option<PathBuf>,
    /// Stream wiring.
    pub stdio: StdioMode,
}

impl ExecCommand {
    /// Create a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            stdio: StdioMode::default(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command inside `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Use the given stdio wiring.
    #[must_use]
    pub const fn with_stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = stdio;
        self
    }

    /// Program name as shown to the user (file name of the program path).
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.file_name().map_or_else(
            || self.program.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        )
    }

    /// The full command line, for logs and error messages.
    #[must_use]
    pub fn label(&self) -> String {
        std::iter::once(self.program_name())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether any argument equals `value`.
    #[must_use]
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }
}

/// Shared flag used to abort running and future subprocesses.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token in the non-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Abstraction over external command execution.
///
/// Only [`execute`](Self::execute) must be implemented; the named entry
/// points choose the stdio wiring and error reporting around it.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Execute `cmd` honouring its [`StdioMode`].
    ///
    /// # Errors
    ///
    /// Returns an [`ExecError`] when the program cannot be found or started,
    /// its output pipe cannot be created, waiting fails, it exits non-zero,
    /// or the run is cancelled.
    fn execute(&self, cmd: &ExecCommand) -> Result<(), ExecError>;

    /// Run `cmd` with stdout streamed to the console.
    ///
    /// # Errors
    ///
    /// Propagates the [`ExecError`] from [`execute`](Self::execute) after
    /// logging it at debug level.
    fn run(&self, cmd: &ExecCommand) -> Result<(), ExecError> {
        let cmd = cmd.clone().with_stdio(StdioMode::Streamed);
        self.execute(&cmd).inspect_err(|e| {
            tracing::debug!("{} failed: {e}", cmd.label());
        })
    }

    /// Run `cmd` attached to the terminal (credential prompts, progress bars).
    ///
    /// # Errors
    ///
    /// Propagates the [`ExecError`] from [`execute`](Self::execute).
    fn run_interactive(&self, cmd: &ExecCommand) -> Result<(), ExecError> {
        self.execute(&cmd.clone().with_stdio(StdioMode::Interactive))
    }

    /// Run `cmd` in its own stdio mode, returning the execution error
    /// undecorated so that the caller can attach its own stage label.
    ///
    /// # Errors
    ///
    /// Propagates the [`ExecError`] from [`execute`](Self::execute).
    fn run_or_die(&self, cmd: &ExecCommand) -> Result<(), ExecError> {
        self.execute(cmd)
    }
}

/// Production [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    cancel: CancelToken,
}

impl SystemExecutor {
    /// Create an executor that aborts when `cancel` is triggered.
    #[must_use]
    pub const fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    fn spawn(cmd: &ExecCommand) -> Result<Child, ExecError> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.dir {
            command.current_dir(dir);
        }
        match cmd.stdio {
            StdioMode::Streamed => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit());
            }
            StdioMode::Interactive => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }
        command.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ExecError::NotFound {
                    program: cmd.program.display().to_string(),
                }
            } else {
                ExecError::Spawn {
                    program: cmd.program.display().to_string(),
                    source,
                }
            }
        })
    }

    /// Poll `child` until it exits, killing it if cancellation is requested.
    fn wait(&self, child: &mut Child, cmd: &ExecCommand) -> Result<(), ExecError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(ExecError::Failed {
                        command: cmd.label(),
                        code: status.code(),
                    });
                }
                Ok(None) if self.cancel.is_cancelled() => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecError::Cancelled {
                        command: cmd.label(),
                    });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(ExecError::Wait {
                        command: cmd.label(),
                        source,
                    });
                }
            }
        }
    }
}

/// Copy `source` to `sink` line by line until EOF.
///
/// Lines are read as bytes and decoded lossily, so non-UTF-8 output never
/// stops the drain. A final line without a newline still gets one.
fn drain_lines(source: impl Read, sink: &mut impl Write) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let _ = writeln!(sink, "{}", line.trim_end_matches(['\n', '\r']));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(_) => break,
        }
    }
    let _ = sink.flush();
}

impl Executor for SystemExecutor {
    fn execute(&self, cmd: &ExecCommand) -> Result<(), ExecError> {
        if self.cancel.is_cancelled() {
            return Err(ExecError::Cancelled {
                command: cmd.label(),
            });
        }
        tracing::debug!("exec: {}", cmd.label());

        let mut child = Self::spawn(cmd)?;
        match cmd.stdio {
            StdioMode::Interactive => self.wait(&mut child, cmd),
            StdioMode::Streamed => {
                let Some(stdout) = child.stdout.take() else {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecError::Pipe {
                        program: cmd.program_name(),
                    });
                };
                // The drain thread is joined before returning so trailing
                // output is never lost.
                std::thread::scope(|scope| {
                    let drain = scope.spawn(move || drain_lines(stdout, &mut io::stdout()));
                    let status = self.wait(&mut child, cmd);
                    let _ = drain.join();
                    status
                })
            }
        }
    }
}

/// Convenience: a `git` command running inside `dir`.
#[must_use]
pub fn git_in(dir: &Path) -> ExecCommand {
    ExecCommand::new("git").current_dir(dir)
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn label_joins_program_name_and_args() {
        let cmd = ExecCommand::new("/usr/local/bin/brew").args(["install", "git"]);
        assert_eq!(cmd.label(), "brew install git");
        assert_eq!(cmd.program_name(), "brew");
    }

    #[test]
    fn builder_sets_dir_and_stdio() {
        let cmd = ExecCommand::new("git")
            .arg("status")
            .current_dir("/tmp")
            .with_stdio(StdioMode::Interactive);
        assert_eq!(cmd.dir, Some(PathBuf::from("/tmp")));
        assert_eq!(cmd.stdio, StdioMode::Interactive);
        assert!(cmd.has_arg("status"));
        assert!(!cmd.has_arg("push"));
    }

    #[test]
    fn default_stdio_is_streamed() {
        assert_eq!(ExecCommand::new("true").stdio, StdioMode::Streamed);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn git_in_sets_working_directory() {
        let cmd = git_in(Path::new("/src/dotfiles")).arg("status");
        assert_eq!(cmd.label(), "git status");
        assert_eq!(cmd.dir, Some(PathBuf::from("/src/dotfiles")));
    }

    #[cfg(unix)]
    #[test]
    fn run_streams_successful_command() {
        let executor = SystemExecutor::default();
        executor
            .run(&ExecCommand::new("echo").arg("hello"))
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn run_reports_non_zero_exit() {
        let executor = SystemExecutor::default();
        let err = executor.run(&ExecCommand::new("false")).unwrap_err();
        assert!(matches!(err, ExecError::Failed { code: Some(1), .. }));
    }

    #[test]
    fn run_reports_missing_program() {
        let executor = SystemExecutor::default();
        let err = executor
            .run(&ExecCommand::new("this-program-does-not-exist-12345"))
            .unwrap_err();
        assert!(matches!(err, ExecError::NotFound { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn run_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let executor = SystemExecutor::default();
        executor
            .run(&ExecCommand::new("touch").arg("marker").current_dir(dir.path()))
            .unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn run_or_die_returns_failure_undecorated() {
        let executor = SystemExecutor::default();
        let err = executor
            .run_or_die(&ExecCommand::new("sh").args(["-c", "exit 3"]))
            .unwrap_err();
        assert!(matches!(err, ExecError::Failed { code: Some(3), .. }));
    }

    #[test]
    fn drain_decodes_invalid_utf8_and_keeps_reading() {
        let mut out = Vec::new();
        drain_lines(&b"caf\xe9 install\ndone\n"[..], &mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "caf\u{fffd} install\ndone\n");
    }

    #[test]
    fn drain_keeps_trailing_line_without_newline() {
        let mut out = Vec::new();
        drain_lines(&b"Setting up jq\r\n100%"[..], &mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "Setting up jq\n100%\n");
    }

    #[test]
    fn drain_copies_output_larger_than_a_pipe_buffer() {
        let input = format!("{}\n", "x".repeat(99)).repeat(4000);
        let mut out = Vec::new();
        drain_lines(input.as_bytes(), &mut out);
        assert_eq!(out.len(), input.len());
    }

    #[cfg(unix)]
    #[test]
    fn run_survives_non_utf8_output_followed_by_bulk_output() {
        let executor = SystemExecutor::default();
        executor
            .run(&ExecCommand::new("sh").args([
                "-c",
                "printf '\\377\\n'; head -c 300000 /dev/zero | tr '\\0' 'a'",
            ]))
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn run_waits_for_output_written_just_before_exit() {
        let executor = SystemExecutor::default();
        executor
            .run(&ExecCommand::new("sh").args(["-c", "sleep 0.1; printf 'last line'"]))
            .unwrap();
    }

    #[test]
    fn cancelled_executor_refuses_to_start() {
        let token = CancelToken::new();
        token.cancel();
        let executor = SystemExecutor::new(token);
        let err = executor.run(&ExecCommand::new("echo")).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_kills_running_child() {
        let token = CancelToken::new();
        let executor = SystemExecutor::new(token.clone());
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            token.cancel();
        });
        let started = std::time::Instant::now();
        let err = executor
            .run(&ExecCommand::new("sleep").arg("30"))
            .unwrap_err();
        canceller.join().unwrap();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
