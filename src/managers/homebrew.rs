//! Homebrew and its cask extension.
use std::path::{Path, PathBuf};

use super::{ManagerEnv, Operation, PackageManager, not_found, run_command};
use crate::error::PackageManagerError;
use crate::exec::{ExecCommand, StdioMode};
use crate::platform::Os;

/// Where `brew` lives on an Intel or Rosetta macOS install.
pub const BREW_PATH: &str = "/usr/local/bin/brew";

/// Official Homebrew installer.
const INSTALL_SCRIPT_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

/// Directory that exists once `homebrew/cask` has been tapped.
pub const CASK_TAP_DIR: &str = "/usr/local/Homebrew/Library/Taps/homebrew/homebrew-cask";

fn brew(path: &Path) -> ExecCommand {
    ExecCommand::new(path)
}

/// `brew`: the primary manager on macOS.
#[derive(Debug)]
pub struct Homebrew {
    path: PathBuf,
    env: ManagerEnv,
}

impl Homebrew {
    /// Homebrew at its standard location.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(BREW_PATH),
            env,
        }
    }
}

impl PackageManager for Homebrew {
    fn name(&self) -> &'static str {
        "brew"
    }

    fn exec_path(&self) -> &Path {
        &self.path
    }

    fn env(&self) -> &ManagerEnv {
        &self.env
    }

    fn primary_on(&self) -> Option<Os> {
        Some(Os::MacOs)
    }

    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand> {
        let cmd = brew(&self.path);
        match (op, package) {
            (Operation::Install, Some(p)) => Some(cmd.args(["install", p])),
            (Operation::Uninstall, Some(p)) => Some(cmd.args(["uninstall", p])),
            (Operation::Upgrade, Some(p)) => Some(cmd.args(["upgrade", p])),
            (Operation::Cleanup, None) => Some(cmd.arg("cleanup")),
            (Operation::UpdateAll, None) => Some(cmd.arg("update")),
            (Operation::UpgradeAll, None) => Some(cmd.arg("upgrade")),
            _ => None,
        }
    }

    /// Runs the official installer when `brew` is missing.
    fn setup(&self) -> Result<(), PackageManagerError> {
        if self.is_installed() {
            return Ok(());
        }
        tracing::info!("installing Homebrew");
        let script = format!(
            "script=$(curl -fsSL {INSTALL_SCRIPT_URL}) && /bin/bash -c \"$script\""
        );
        let cmd = ExecCommand::new("/bin/bash")
            .args(["-c", script.as_str()])
            .with_stdio(StdioMode::Interactive);
        run_command(self, Operation::Setup, None, &cmd)?;
        if self.is_installed() {
            Ok(())
        } else {
            Err(not_found(self))
        }
    }
}

/// `cask`: GUI applications through `brew --cask`.
#[derive(Debug)]
pub struct Cask {
    path: PathBuf,
    tap_dir: PathBuf,
    env: ManagerEnv,
}

impl Cask {
    /// Cask backed by the standard `brew`.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(BREW_PATH),
            tap_dir: PathBuf::from(CASK_TAP_DIR),
            env,
        }
    }
}

impl PackageManager for Cask {
    fn name(&self) -> &'static str {
        "cask"
    }

    fn exec_path(&self) -> &Path {
        &self.path
    }

    fn env(&self) -> &ManagerEnv {
        &self.env
    }

    fn is_extension(&self) -> bool {
        true
    }

    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand> {
        let cmd = brew(&self.path);
        match (op, package) {
            (Operation::Install, Some(p)) => Some(cmd.args(["install", "--cask", p])),
            (Operation::Uninstall, Some(p)) => Some(cmd.args(["uninstall", "--cask", p])),
            (Operation::Upgrade, Some(p)) => Some(cmd.args(["upgrade", "--cask", p])),
            (Operation::Cleanup, None) => Some(cmd.arg("cleanup")),
            (Operation::UpdateAll, None) => Some(cmd.arg("update")),
            (Operation::UpgradeAll, None) => Some(cmd.args(["upgrade", "--cask"])),
            _ => None,
        }
    }

    /// Requires `brew`; taps `homebrew/cask` only when the tap is missing.
    fn setup(&self) -> Result<(), PackageManagerError> {
        if !self.is_installed() {
            return Err(not_found(self));
        }
        if self.env.fs.is_dir(&self.tap_dir) {
            return Ok(());
        }
        let cmd = brew(&self.path).args(["tap", "homebrew/cask"]);
        run_command(self, Operation::Setup, None, &cmd)
    }
}
