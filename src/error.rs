//! Domain-specific error types for the bootstrapper.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//! Each layer wraps the error of the layer below exactly once, adding its own
//! context (manager, operation, package, git stage, path).
//!
//! # Error hierarchy
//!
//! ```text
//! SetupError
//! ├── Bootstrap { PackageManagerError } : OS package manager could not be set up
//! ├── Config(ConfigError)                : reading/writing config.toml
//! ├── Dotfiles(DotfilesError)            : mirror directory and git pipeline
//! └── Prompt(io::Error)                  : preset selection
//!
//! PackageManagerError
//! ├── NotFound              : executable missing at its configured path
//! ├── UnsupportedOperation  : verb not implemented by the manager
//! └── ExecutionFailed       : wraps ExecError with manager/operation/package
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::dotfiles::GitStage;
use crate::managers::Operation;

/// Errors raised while launching or waiting on an external process.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program does not exist (spawn reported `NotFound`).
    #[error("'{program}' could not be found")]
    NotFound {
        /// Program that was invoked.
        program: String,
    },

    /// The program exists but could not be started.
    #[error("could not start '{program}': {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The standard-output pipe for a streamed command was not available.
    #[error("could not create output pipe for '{program}'")]
    Pipe {
        /// Program that was invoked.
        program: String,
    },

    /// Waiting for the process to exit failed.
    #[error("could not wait for '{command}': {source}")]
    Wait {
        /// Full command line.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("'{command}' reported failure ({})", describe_exit(.code.as_ref()))]
    Failed {
        /// Full command line.
        command: String,
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// The run was cancelled before or while the process executed.
    #[error("'{command}' was cancelled")]
    Cancelled {
        /// Full command line.
        command: String,
    },
}

fn describe_exit(code: Option<&i32>) -> String {
    code.map_or_else(
        || "terminated by signal".to_string(),
        |c| format!("exit {c}"),
    )
}

impl ExecError {
    /// Whether this error stems from a cancellation request.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors raised by package manager operations.
#[derive(Error, Debug)]
pub enum PackageManagerError {
    /// The manager's executable is missing at its configured path.
    #[error("{manager} is not installed at {}", .path.display())]
    NotFound {
        /// Manager name.
        manager: String,
        /// Configured executable path.
        path: PathBuf,
    },

    /// The manager has no notion of the requested operation.
    #[error("operation '{operation}' is not supported by {manager}")]
    UnsupportedOperation {
        /// Manager name.
        manager: String,
        /// Requested operation.
        operation: Operation,
    },

    /// The external tool ran (or tried to) and failed.
    #[error("{manager} {operation}{} failed", package_suffix(.package.as_deref()))]
    ExecutionFailed {
        /// Manager name.
        manager: String,
        /// Operation being performed.
        operation: Operation,
        /// Package the operation targeted, if any.
        package: Option<String>,
        /// Underlying process error.
        source: ExecError,
    },
}

fn package_suffix(package: Option<&str>) -> String {
    package.map_or_else(String::new, |p| format!(" '{p}'"))
}

impl PackageManagerError {
    /// Whether the underlying process was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::ExecutionFailed { source, .. } if source.is_cancelled())
    }
}

/// Errors raised by the dotfiles synchronizer.
#[derive(Error, Debug)]
pub enum DotfilesError {
    /// Creating the mirror directory was denied.
    #[error("permission denied creating {}", .path.display())]
    PermissionDenied {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Any other filesystem failure while preparing the mirror.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A dotfile could not be moved into the mirror.
    #[error("cannot move dotfile '{name}' into the mirror: {source}")]
    CannotMoveDotfile {
        /// Entry name relative to the home directory.
        name: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A symlink could not be created at the original location.
    #[error("cannot symlink {} -> {}: {source}", .link.display(), .target.display())]
    CannotSymlink {
        /// Location of the link.
        link: PathBuf,
        /// Path the link should point to.
        target: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The remote repository could not be listed.
    #[error("dotfiles repository '{repository}' is unavailable")]
    RepositoryUnavailable {
        /// Remote reference.
        repository: String,
        /// Underlying process error.
        source: ExecError,
    },

    /// No remote repository is configured.
    #[error("no dotfiles repository configured (set dotfiles.repository)")]
    RepositoryNotConfigured,

    /// A git sub-step failed.
    #[error("git {stage} failed in {}", .dir.display())]
    GitStageFailed {
        /// The git step that failed.
        stage: GitStage,
        /// Mirror directory.
        dir: PathBuf,
        /// Underlying process error.
        source: ExecError,
    },
}

impl DotfilesError {
    /// The git stage that failed, if this is a git error.
    #[must_use]
    pub const fn git_stage(&self) -> Option<GitStage> {
        match self {
            Self::GitStageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Errors that arise from configuration loading and saving.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error reading config file {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the expected schema.
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },

    /// The configuration could not be serialized.
    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration file could not be written.
    #[error("IO error writing config file {}: {source}", .path.display())]
    Write {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that abort the setup/restore/save operations.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The OS package manager could not be bootstrapped.
    #[error("could not bootstrap {manager}")]
    Bootstrap {
        /// Manager name.
        manager: String,
        /// Underlying manager error.
        source: PackageManagerError,
    },

    /// Configuration could not be loaded or persisted.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The dotfiles pipeline failed.
    #[error(transparent)]
    Dotfiles(#[from] DotfilesError),

    /// Preset selection failed.
    #[error("no preset selected: {0}")]
    Prompt(#[source] std::io::Error),
}
