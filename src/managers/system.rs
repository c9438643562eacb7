//! Linux distribution managers.  Both run through `sudo` attached to the
//! terminal so password prompts work.
use std::path::{Path, PathBuf};

use super::{ManagerEnv, Operation, PackageManager, sudo};
use crate::exec::ExecCommand;
use crate::platform::Os;

/// Debian / Ubuntu `apt-get`.
pub const APT_PATH: &str = "/usr/bin/apt-get";

/// Fedora / RHEL `yum`.
pub const YUM_PATH: &str = "/usr/bin/yum";

/// `apt`: the primary manager on Debian-family Linux.
#[derive(Debug)]
pub struct Apt {
    path: PathBuf,
    env: ManagerEnv,
}

impl Apt {
    /// `apt-get` at its standard location.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(APT_PATH),
            env,
        }
    }
}

impl PackageManager for Apt {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn exec_path(&self) -> &Path {
        &self.path
    }

    fn env(&self) -> &ManagerEnv {
        &self.env
    }

    fn primary_on(&self) -> Option<Os> {
        Some(Os::Linux)
    }

    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand> {
        let path = &self.path;
        match (op, package) {
            (Operation::Install, Some(p)) => Some(sudo(path, &["install", "-y", p])),
            (Operation::Uninstall, Some(p)) => Some(sudo(path, &["remove", "-y", p])),
            (Operation::Upgrade, Some(p)) => {
                Some(sudo(path, &["install", "--only-upgrade", "-y", p]))
            }
            (Operation::Cleanup, None) => Some(sudo(path, &["autoremove", "-y"])),
            (Operation::UpdateAll, None) => Some(sudo(path, &["update"])),
            (Operation::UpgradeAll, None) => Some(sudo(path, &["upgrade", "-y"])),
            _ => None,
        }
    }
}

/// `yum`: the primary manager on Red Hat-family Linux.
#[derive(Debug)]
pub struct Yum {
    path: PathBuf,
    env: ManagerEnv,
}

impl Yum {
    /// `yum` at its standard location.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(YUM_PATH),
            env,
        }
    }
}

impl PackageManager for Yum {
    fn name(&self) -> &'static str {
        "yum"
    }

    fn exec_path(&self) -> &Path {
        &self.path
    }

    fn env(&self) -> &ManagerEnv {
        &self.env
    }

    fn primary_on(&self) -> Option<Os> {
        Some(Os::Linux)
    }

    fn command(&self, op: Operation, package: Option<&str>) -> Option<ExecCommand> {
        let path = &self.path;
        match (op, package) {
            (Operation::Install, Some(p)) => Some(sudo(path, &["install", "-y", p])),
            (Operation::Uninstall, Some(p)) => Some(sudo(path, &["remove", "-y", p])),
            (Operation::Update, Some(p)) => Some(sudo(path, &["update", "-y", p])),
            (Operation::Upgrade, Some(p)) => Some(sudo(path, &["upgrade", "-y", p])),
            (Operation::Cleanup, None) => Some(sudo(path, &["clean", "all"])),
            (Operation::UpdateAll, None) => Some(sudo(path, &["makecache"])),
            (Operation::UpgradeAll, None) => Some(sudo(path, &["upgrade", "-y"])),
            _ => None,
        }
    }
}
