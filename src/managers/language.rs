//! Language ecosystem managers: pip, npm and RubyGems.
//!
//! These are never the system's primary manager.
use std::path::{Path, PathBuf};

use super::{ManagerEnv, Operation, PackageManager, not_found, run_command};
use crate::error::PackageManagerError;
use crate::exec::ExecCommand;

/// Python's `pip3`.
pub const PIP_PATH: &str = "/usr/bin/pip3";

/// Node's `npm`.
pub const NPM_PATH: &str = "/usr/local/bin/npm";

/// Ruby's `gem`.
pub const GEM_PATH: &str = "/usr/bin/gem";

/// Interpreter used to bootstrap pip.
const PYTHON: &str = "python3";

/// `pip`: user-level Python packages.
#[derive(Debug)]
pub struct Pip {
    path: PathBuf,
    env: ManagerEnv,
}

impl Pip {
    /// `pip3` at its standard location.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(PIP_PATH),
            env,
        }
    }
}

impl PackageManager for Pip {
    fn name(&self) -> &'static str {
        "pip"
    }

    fn exec_path(&self) -> &Path {
        &self.path
    }

    fn env(&self) -> &ManagerEnv {
        &self.env
    }

    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand> {
        let cmd = ExecCommand::new(&self.path);
        match (op, package) {
            (Operation::Install, Some(p)) => Some(cmd.args(["install", "--user", p])),
            (Operation::Uninstall, Some(p)) => Some(cmd.args(["uninstall", "-y", p])),
            (Operation::Upgrade, Some(p)) => {
                Some(cmd.args(["install", "--user", "--upgrade", p]))
            }
            _ => None,
        }
    }

    /// Bootstraps pip through `ensurepip` when it is missing.
    fn setup(&self) -> Result<(), PackageManagerError> {
        if self.is_installed() {
            return Ok(());
        }
        let cmd = ExecCommand::new(PYTHON).args(["-m", "ensurepip", "--upgrade"]);
        run_command(self, Operation::Setup, None, &cmd)?;
        if self.is_installed() {
            Ok(())
        } else {
            Err(not_found(self))
        }
    }
}

/// `npm`: global Node packages.
#[derive(Debug)]
pub struct Npm {
    path: PathBuf,
    env: ManagerEnv,
}

impl Npm {
    /// `npm` at its standard location.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(NPM_PATH),
            env,
        }
    }
}

impl PackageManager for Npm {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn exec_path(&self) -> &Path {
        &self.path
    }

    fn env(&self) -> &ManagerEnv {
        &self.env
    }

    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand> {
        let cmd = ExecCommand::new(&self.path);
        match (op, package) {
            (Operation::Install, Some(p)) => Some(cmd.args(["install", "-g", p])),
            (Operation::Uninstall, Some(p)) => Some(cmd.args(["uninstall", "-g", p])),
            (Operation::Update, Some(p)) => Some(cmd.args(["update", "-g", p])),
            (Operation::Upgrade, Some(p)) => {
                Some(cmd.args(["install", "-g", format!("{p}@latest").as_str()]))
            }
            (Operation::Cleanup, None) => Some(cmd.args(["cache", "clean", "--force"])),
            (Operation::UpdateAll, None) => Some(cmd.args(["update", "-g"])),
            _ => None,
        }
    }
}

/// `gem`: Ruby gems.
#[derive(Debug)]
pub struct Gem {
    path: PathBuf,
    env: ManagerEnv,
}

impl Gem {
    /// `gem` at its standard location.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(GEM_PATH),
            env,
        }
    }
}

impl PackageManager for Gem {
    fn name(&self) -> &'static str {
        "gem"
    }

    fn exec_path(&self) -> &Path {
        &self.path
    }

    fn env(&self) -> &ManagerEnv {
        &self.env
    }

    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand> {
        let cmd = ExecCommand::new(&self.path);
        match (op, package) {
            (Operation::Install, Some(p)) => Some(cmd.args(["install", p])),
            (Operation::Uninstall, Some(p)) => Some(cmd.args(["uninstall", "-x", p])),
            (Operation::Update, Some(p)) => Some(cmd.args(["update", p])),
            (Operation::Cleanup, None) => Some(cmd.arg("cleanup")),
            (Operation::UpdateAll, None) => Some(cmd.arg("update")),
            (Operation::UpgradeAll, None) => Some(cmd.args(["update", "--system"])),
            _ => None,
        }
    }
}
