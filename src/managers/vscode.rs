//! Editor extensions through the `code` command line.
use std::path::{Path, PathBuf};

use super::{ManagerEnv, Operation, PackageManager};
use crate::exec::ExecCommand;

/// The `code` launcher installed by "Shell Command: Install 'code' in PATH".
pub const CODE_PATH: &str = "/usr/local/bin/code";

/// `vscode`: editor extensions, identified by `publisher.name`.
#[derive(Debug)]
pub struct VsCode {
    path: PathBuf,
    env: ManagerEnv,
}

impl VsCode {
    /// `code` at its standard location.
    #[must_use]
    pub fn new(env: ManagerEnv) -> Self {
        Self {
            path: PathBuf::from(CODE_PATH),
            env,
        }
    }
}

impl PackageManager for VsCode {
    fn name(&self) -> &'static str {
        "vscode"
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
        let cmd = ExecCommand::new(&self.path);
        match (op, package) {
            (Operation::Install, Some(id)) => Some(cmd.args(["--install-extension", id])),
            (Operation::Uninstall, Some(id)) => Some(cmd.args(["--uninstall-extension", id])),
            (Operation::Upgrade, Some(id)) => {
                Some(cmd.args(["--install-extension", id, "--force"]))
            }
            _ => None,
        }
    }
}
