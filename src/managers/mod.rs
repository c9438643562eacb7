//! Package manager abstraction.
//!
//! Eight external tools share one capability contract, [`PackageManager`].
//! Each variant only describes *which command* an [`Operation`] maps to (or
//! that it has none); the shared [`dispatch`] path performs the
//! unsupported / not-installed checks, picks the stdio wiring and wraps
//! process errors with manager, operation and package context.
//!
//! | manager | install | uninstall | cleanup | update | upgrade | update-all | upgrade-all |
//! |---------|---------|-----------|---------|--------|---------|------------|-------------|
//! | brew    | ✓ | ✓ | ✓ | ✗ | ✓ | ✓ | ✓ |
//! | cask    | ✓ | ✓ | ✓ | ✗ | ✓ | ✓ | ✓ |
//! | apt     | ✓ | ✓ | ✓ | ✗ | ✓ | ✓ | ✓ |
//! | yum     | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ |
//! | pip     | ✓ | ✓ | ✗ | ✗ | ✓ | ✗ | ✗ |
//! | npm     | ✓ | ✓ | ✓ | ✓ | ✓ | ✓ | ✗ |
//! | gem     | ✓ | ✓ | ✓ | ✓ | ✗ | ✓ | ✓ |
//! | vscode  | ✓ | ✓ | ✗ | ✗ | ✓ | ✗ | ✗ |
pub mod homebrew;
pub mod language;
pub mod registry;
pub mod system;
pub mod vscode;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::PackageManagerError;
use crate::exec::{ExecCommand, Executor, StdioMode};
use crate::operations::FileSystemOps;
use crate::platform::{Os, Platform};

pub use homebrew::{Cask, Homebrew};
pub use language::{Gem, Npm, Pip};
pub use registry::{ManagerRegistry, NoOsPackageManager};
pub use system::{Apt, Yum};
pub use vscode::VsCode;

/// A package manager verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Install one package.
    Install,
    /// Remove one package.
    Uninstall,
    /// Remove caches and orphaned dependencies.
    Cleanup,
    /// Refresh metadata for one package.
    Update,
    /// Upgrade one package.
    Upgrade,
    /// Refresh all package metadata.
    UpdateAll,
    /// Upgrade every installed package.
    UpgradeAll,
    /// Bootstrap the manager itself.
    Setup,
}

impl Operation {
    /// Every per-manager verb except [`Setup`](Self::Setup), in table order.
    pub const VERBS: [Self; 7] = [
        Self::Install,
        Self::Uninstall,
        Self::Cleanup,
        Self::Update,
        Self::Upgrade,
        Self::UpdateAll,
        Self::UpgradeAll,
    ];

    /// Whether the verb targets a single package.
    #[must_use]
    pub const fn takes_package(self) -> bool {
        matches!(
            self,
            Self::Install | Self::Uninstall | Self::Update | Self::Upgrade
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Cleanup => "cleanup",
            Self::Update => "update",
            Self::Upgrade => "upgrade",
            Self::UpdateAll => "update-all",
            Self::UpgradeAll => "upgrade-all",
            Self::Setup => "setup",
        };
        f.write_str(s)
    }
}

/// Collaborators every manager is constructed with.
#[derive(Debug, Clone)]
pub struct ManagerEnv {
    /// Process runner.
    pub executor: Arc<dyn Executor>,
    /// Filesystem probe for installed state.
    pub fs: Arc<dyn FileSystemOps>,
    /// Host platform.
    pub platform: Platform,
}

impl ManagerEnv {
    /// Bundle the collaborators.
    #[must_use]
    pub fn new(
        executor: Arc<dyn Executor>,
        fs: Arc<dyn FileSystemOps>,
        platform: Platform,
    ) -> Self {
        Self {
            executor,
            fs,
            platform,
        }
    }
}

/// Common contract of every package manager variant.
///
/// Implementors supply identity and [`command`](Self::command); every verb is
/// provided on top of that.  No installed state is cached: each query probes
/// the filesystem again.
pub trait PackageManager: Send + Sync + fmt::Debug {
    /// Short manager name (`brew`, `apt`, ...), also the manifest key.
    fn name(&self) -> &'static str;

    /// Configured absolute executable path, whether or not it exists.
    fn exec_path(&self) -> &Path;

    /// Collaborators the manager runs with.
    fn env(&self) -> &ManagerEnv;

    /// The command implementing `op`, or `None` when the manager has no
    /// such verb.  `package` is `Some` exactly for per-package verbs.
    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand>;

    /// Platform on which this manager is the system's primary manager.
    fn primary_on(&self) -> Option<Os> {
        None
    }

    /// Extension managers are never primary.
    fn is_extension(&self) -> bool {
        false
    }

    /// Whether the executable exists at [`exec_path`](Self::exec_path).
    fn is_installed(&self) -> bool {
        self.env().fs.exists(self.exec_path())
    }

    /// Installed and native to the host platform.
    fn is_os_package_manager(&self) -> bool {
        !self.is_extension()
            && self.primary_on() == Some(self.env().platform.os)
            && self.is_installed()
    }

    /// Whether `op` has a command at all.
    fn supports(&self, op: Operation) -> bool {
        let sample = op.takes_package().then_some("sample");
        self.command(op, sample).is_some()
    }

    /// Install `package`.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    fn install(&self, package: &str) -> Result<(), PackageManagerError> {
        dispatch(self, Operation::Install, Some(package))
    }

    /// Uninstall `package`.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    fn uninstall(&self, package: &str) -> Result<(), PackageManagerError> {
        dispatch(self, Operation::Uninstall, Some(package))
    }

    /// Clean caches and orphans.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    fn cleanup(&self) -> Result<(), PackageManagerError> {
        dispatch(self, Operation::Cleanup, None)
    }

    /// Refresh one package.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    fn update_one(&self, package: &str) -> Result<(), PackageManagerError> {
        dispatch(self, Operation::Update, Some(package))
    }

    /// Upgrade one package.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    fn upgrade_one(&self, package: &str) -> Result<(), PackageManagerError> {
        dispatch(self, Operation::Upgrade, Some(package))
    }

    /// Refresh all metadata.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    fn update_all(&self) -> Result<(), PackageManagerError> {
        dispatch(self, Operation::UpdateAll, None)
    }

    /// Upgrade everything.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    fn upgrade_all(&self) -> Result<(), PackageManagerError> {
        dispatch(self, Operation::UpgradeAll, None)
    }

    /// Idempotently make the manager available.
    ///
    /// The default succeeds when the tool is installed and reports
    /// [`PackageManagerError::NotFound`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager is missing and cannot bootstrap itself.
    fn setup(&self) -> Result<(), PackageManagerError> {
        if self.is_installed() {
            Ok(())
        } else {
            Err(not_found(self))
        }
    }
}

/// Run `op` on `manager`.
///
/// # Errors
///
/// * [`PackageManagerError::UnsupportedOperation`] when the manager has no
///   command for `op` (nothing is executed);
/// * [`PackageManagerError::NotFound`] when the executable is missing
///   (nothing is executed);
/// * [`PackageManagerError::ExecutionFailed`] when the process fails.
pub fn dispatch<M: PackageManager + ?Sized>(
    manager: &M,
    op: Operation,
    package: Option<&str>,
) -> Result<(), PackageManagerError> {
    let Some(cmd) = manager.command(op, package) else {
        return Err(PackageManagerError::UnsupportedOperation {
            manager: manager.name().to_string(),
            operation: op,
        });
    };
    if !manager.is_installed() {
        return Err(not_found(manager));
    }
    run_command(manager, op, package, &cmd)
}

/// Execute an already-built command on behalf of `manager`, wrapping any
/// failure with the manager context.
pub(crate) fn run_command<M: PackageManager + ?Sized>(
    manager: &M,
    op: Operation,
    package: Option<&str>,
    cmd: &ExecCommand,
) -> Result<(), PackageManagerError> {
    let executor = &manager.env().executor;
    tracing::debug!(manager = manager.name(), operation = %op, "{}", cmd.label());
    let result = match cmd.stdio {
        StdioMode::Interactive => executor.run_interactive(cmd),
        StdioMode::Streamed => executor.run(cmd),
    };
    result.map_err(|source| PackageManagerError::ExecutionFailed {
        manager: manager.name().to_string(),
        operation: op,
        package: package.map(String::from),
        source,
    })
}

pub(crate) fn not_found<M: PackageManager + ?Sized>(manager: &M) -> PackageManagerError {
    PackageManagerError::NotFound {
        manager: manager.name().to_string(),
        path: manager.exec_path().to_path_buf(),
    }
}

/// `sudo <tool> <args>` wired to the terminal for password prompts.
pub(crate) fn sudo(tool: &Path, args: &[&str]) -> ExecCommand {
    ExecCommand::new("sudo")
        .arg(tool.display().to_string())
        .args(args.iter().copied())
        .with_stdio(StdioMode::Interactive)
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::test_helpers::{RecordingExecutor, env_with};
    use super::*;

    fn all_managers(env: &ManagerEnv) -> Vec<Box<dyn PackageManager>> {
        vec![
            Box::new(Homebrew::new(env.clone())),
            Box::new(Cask::new(env.clone())),
            Box::new(Apt::new(env.clone())),
            Box::new(Yum::new(env.clone())),
            Box::new(Pip::new(env.clone())),
            Box::new(Npm::new(env.clone())),
            Box::new(Gem::new(env.clone())),
            Box::new(VsCode::new(env.clone())),
        ]
    }

    fn support_table(managers: &[Box<dyn PackageManager>]) -> String {
        managers
            .iter()
            .map(|m| {
                let cells: Vec<&str> = Operation::VERBS
                    .iter()
                    .map(|op| if m.supports(*op) { "y" } else { "-" })
                    .collect();
                format!("{:<6} {}", m.name(), cells.join(" "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn operation_display() {
        assert_eq!(Operation::UpdateAll.to_string(), "update-all");
        assert_eq!(Operation::Install.to_string(), "install");
        assert_eq!(Operation::Setup.to_string(), "setup");
    }

    #[test]
    fn support_matrix() {
        let exec = Arc::new(RecordingExecutor::default());
        let env = env_with(Os::Linux, &[], exec);
        insta::assert_snapshot!(support_table(&all_managers(&env)), @r"
        brew   y y y - y y y
        cask   y y y - y y y
        apt    y y y - y y y
        yum    y y y y y y y
        pip    y y - - y - -
        npm    y y y y y y -
        gem    y y y y - y y
        vscode y y - - y - -
        ");
    }

    #[test]
    fn unsupported_operations_never_execute() {
        let exec = Arc::new(RecordingExecutor::default());
        let all_paths = [
            "/usr/local/bin/brew",
            "/usr/bin/apt-get",
            "/usr/bin/yum",
            "/usr/bin/pip3",
            "/usr/local/bin/npm",
            "/usr/bin/gem",
            "/usr/local/bin/code",
        ];
        let env = env_with(Os::Linux, &all_paths, Arc::clone(&exec));
        for manager in all_managers(&env) {
            for op in Operation::VERBS {
                if manager.supports(op) {
                    continue;
                }
                let pkg = op.takes_package().then_some("pkg");
                let err = dispatch(manager.as_ref(), op, pkg).unwrap_err();
                assert!(
                    matches!(err, PackageManagerError::UnsupportedOperation { operation, .. } if operation == op),
                    "{} {op}: {err}",
                    manager.name()
                );
            }
        }
        assert!(exec.labels().is_empty(), "ran: {:?}", exec.labels());
    }

    #[test]
    fn missing_executable_is_not_found_without_executing() {
        let exec = Arc::new(RecordingExecutor::default());
        let env = env_with(Os::Linux, &[], Arc::clone(&exec));
        for manager in all_managers(&env) {
            let err = manager.install("pkg").unwrap_err();
            assert!(
                matches!(err, PackageManagerError::NotFound { .. }),
                "{}: {err}",
                manager.name()
            );
        }
        assert!(exec.labels().is_empty());
    }

    #[test]
    fn exec_path_is_invariant_of_installation() {
        let exec = Arc::new(RecordingExecutor::default());
        let absent = env_with(Os::MacOs, &[], Arc::clone(&exec));
        let present = env_with(Os::MacOs, &["/usr/local/bin/brew"], exec);
        assert_eq!(
            Homebrew::new(absent).exec_path(),
            Homebrew::new(present).exec_path()
        );
    }

    #[test]
    fn extension_and_language_managers_are_never_primary() {
        let exec = Arc::new(RecordingExecutor::default());
        let everything = [
            "/usr/local/bin/brew",
            "/usr/bin/pip3",
            "/usr/local/bin/npm",
            "/usr/bin/gem",
            "/usr/local/bin/code",
        ];
        for os in [Os::Linux, Os::MacOs] {
            let env = env_with(os, &everything, Arc::clone(&exec));
            for manager in all_managers(&env) {
                if manager.is_extension() || ["pip", "npm", "gem"].contains(&manager.name()) {
                    assert!(!manager.is_os_package_manager(), "{}", manager.name());
                }
            }
        }
    }

    #[test]
    fn failure_is_wrapped_with_context() {
        let exec = Arc::new(RecordingExecutor::failing_on(&["install ripgrep"]));
        let env = env_with(Os::MacOs, &["/usr/local/bin/brew"], exec);
        let err = Homebrew::new(env).install("ripgrep").unwrap_err();
        assert_eq!(err.to_string(), "brew install 'ripgrep' failed");
    }
}
