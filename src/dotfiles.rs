//! Dotfiles mirror: a git repository holding configuration files that were
//! moved out of the home directory and replaced by symlinks.
//!
//! Saving runs four stages in strict order, stopping at the first failure:
//!
//! ```text
//! Absent ──ensure_dir──▶ DirEnsured ──import──▶ Imported
//!        ──ensure_remote──▶ RemoteVerified ──persist──▶ Persisted
//! ```
//!
//! Nothing is rolled back: a dotfile that was moved but could not be linked
//! back stays in the mirror.
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{DotfilesError, ExecError};
use crate::exec::{ExecCommand, Executor, StdioMode, git_in};
use crate::operations::FileSystemOps;

/// Commit message used when none is given.
pub const DEFAULT_SAVE_MESSAGE: &str = "Update dotfiles";

/// Branch the mirror is initialized with and pushed to.
pub const DEFAULT_BRANCH: &str = "main";

/// Home entries that are never imported automatically.
const RESERVED_NAMES: [&str; 8] = [
    ".bash_history",
    ".cache",
    ".bash_sessions",
    ".zsh_history",
    ".zsh_sessions",
    ".Trash",
    ".ssh",
    ".DS_Store",
];

/// Mirror entries that are never linked back into the home directory.
const MIRROR_METADATA: [&str; 2] = [".git", ".gitignore"];

/// Written to a freshly created mirror so credentials are never committed.
const DEFAULT_GITIGNORE: &str = "\
# Credentials and secrets
*.pem
*.key
*.p12
*.pfx
id_rsa*
id_ed25519*
id_ecdsa*
.netrc
.npmrc
.pypirc
.git-credentials
.aws/credentials
.docker/config.json
.gnupg/
.env
.env.*

# Caches, including devsetup's own logs
.cache/

# Editor and OS noise
.DS_Store
*.swp
";

/// A git step inside the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitStage {
    /// `git init`.
    Init,
    /// `git add -A`.
    Stage,
    /// `git commit`.
    Commit,
    /// `git push`.
    Push,
    /// `git clone`.
    Clone,
    /// `git remote set-url` / `git remote add`.
    Remote,
}

impl fmt::Display for GitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Stage => "stage",
            Self::Commit => "commit",
            Self::Push => "push",
            Self::Clone => "clone",
            Self::Remote => "remote",
        };
        f.write_str(s)
    }
}

/// Furthest save stage reached by a synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SyncStage {
    /// Nothing done yet.
    Absent,
    /// Mirror directory exists and is a git repository.
    DirEnsured,
    /// Dotfiles moved into the mirror and linked back.
    Imported,
    /// Remote reachable and configured as `origin`.
    RemoteVerified,
    /// Committed and pushed.
    Persisted,
}

/// Inputs to [`DotfilesSynchronizer::save`].
#[derive(Debug, Clone)]
pub struct SaveRequest<'a> {
    /// Remote repository; `None` fails at the remote stage.
    pub repository: Option<&'a str>,
    /// Mirror directory.
    pub dir: &'a Path,
    /// Home-relative entries to import; empty means auto-discover.
    pub selected: &'a [String],
    /// Commit message; blank means [`DEFAULT_SAVE_MESSAGE`].
    pub message: &'a str,
}

/// What [`DotfilesSynchronizer::restore`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Whether the mirror was cloned during this run.
    pub cloned: bool,
    /// Entries newly linked into the home directory.
    pub linked: Vec<String>,
    /// Entries whose home location is occupied by something else.
    pub occupied: Vec<String>,
}

/// Drives the mirror through its save and restore pipelines.
#[derive(Debug)]
pub struct DotfilesSynchronizer {
    home: PathBuf,
    fs: Arc<dyn FileSystemOps>,
    executor: Arc<dyn Executor>,
    stage: Mutex<SyncStage>,
}

impl DotfilesSynchronizer {
    /// Synchronizer for dotfiles living in `home`.
    #[must_use]
    pub fn new(home: PathBuf, fs: Arc<dyn FileSystemOps>, executor: Arc<dyn Executor>) -> Self {
        Self {
            home,
            fs,
            executor,
            stage: Mutex::new(SyncStage::Absent),
        }
    }

    /// Furthest save stage reached so far.
    #[must_use]
    pub fn stage(&self) -> SyncStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, stage: SyncStage) {
        tracing::debug!(sync = ?stage, "dotfiles stage reached");
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    /// Create the mirror as a git repository with a default `.gitignore`.
    ///
    /// Idempotent: an existing repository is left untouched.
    ///
    /// # Errors
    ///
    /// * [`DotfilesError::PermissionDenied`] when the directory cannot be
    ///   created for lack of permission;
    /// * [`DotfilesError::Io`] for other filesystem failures;
    /// * [`DotfilesError::GitStageFailed`] with [`GitStage::Init`].
    pub fn ensure_dir(&self, dir: &Path) -> Result<(), DotfilesError> {
        if !self.fs.is_dir(dir) {
            tracing::info!("creating dotfiles mirror at {}", dir.display());
            self.fs
                .create_dir_all(dir)
                .map_err(|source| dir_error(dir, source))?;
        }

        if !self.fs.exists(&dir.join(".git")) {
            let init = git_in(dir)
                .arg("init")
                .arg(format!("--initial-branch={DEFAULT_BRANCH}"));
            self.git(GitStage::Init, dir, &init)?;
        }

        let ignore = dir.join(".gitignore");
        if !self.fs.exists(&ignore) {
            self.fs
                .write(&ignore, DEFAULT_GITIGNORE.as_bytes())
                .map_err(|source| dir_error(&ignore, source))?;
        }

        self.advance(SyncStage::DirEnsured);
        Ok(())
    }

    /// Hidden top-level home entries eligible for import.
    ///
    /// Skips reserved names, the mirror itself and its ancestors, and entries
    /// that already link into the mirror.
    ///
    /// # Errors
    ///
    /// Returns [`DotfilesError::Io`] if the home directory cannot be listed.
    pub fn discover(&self, dir: &Path) -> Result<Vec<String>, DotfilesError> {
        let entries = self
            .fs
            .read_dir(&self.home)
            .map_err(|source| dir_error(&self.home, source))?;
        let mirror = self.fs.canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());

        Ok(entries
            .into_iter()
            .filter(|path| !dir.starts_with(path) && !mirror.starts_with(path))
            .filter(|path| !self.links_into(path, &mirror))
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                (name.starts_with('.') && !RESERVED_NAMES.contains(&name.as_str()))
                    .then_some(name)
            })
            .collect())
    }

    fn links_into(&self, path: &Path, mirror: &Path) -> bool {
        self.fs.is_symlink(path)
            && self
                .fs
                .canonicalize(path)
                .is_ok_and(|resolved| resolved.starts_with(mirror))
    }

    /// Move each selected entry into the mirror and symlink it back.
    ///
    /// An empty selection imports everything [`discover`](Self::discover)
    /// finds.  Returns the names that were imported.
    ///
    /// # Errors
    ///
    /// * [`DotfilesError::CannotMoveDotfile`] when the source is missing or
    ///   cannot be moved (nothing is changed for that entry);
    /// * [`DotfilesError::CannotSymlink`] when the link cannot be created (the
    ///   moved entry stays in the mirror).
    pub fn import(&self, selected: &[String], dir: &Path) -> Result<Vec<String>, DotfilesError> {
        let names = if selected.is_empty() {
            self.discover(dir)?
        } else {
            selected.iter().map(|s| self.home_relative(s)).collect()
        };

        let mut imported = Vec::with_capacity(names.len());
        for name in names {
            if self.import_one(&name, dir)? {
                tracing::info!("imported {name}");
                imported.push(name);
            }
        }

        self.advance(SyncStage::Imported);
        Ok(imported)
    }

    /// Accept `~/.x`, `/home/me/.x` or `.x`.
    fn home_relative(&self, name: &str) -> String {
        let trimmed = name.strip_prefix("~/").unwrap_or(name);
        Path::new(trimmed)
            .strip_prefix(&self.home)
            .map_or_else(|_| trimmed.to_string(), |p| p.to_string_lossy().into_owned())
    }

    /// Returns `false` when the entry already lives in the mirror.
    fn import_one(&self, name: &str, dir: &Path) -> Result<bool, DotfilesError> {
        let source = self.home.join(name);
        let dest = dir.join(name);
        let cannot_move = |source: io::Error| DotfilesError::CannotMoveDotfile {
            name: name.to_string(),
            source,
        };

        if !self.fs.exists(&source) && !self.fs.is_symlink(&source) {
            return Err(cannot_move(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", source.display()),
            )));
        }
        if self.same_file(&source, &dest) {
            tracing::debug!("{name} already in the mirror");
            return Ok(false);
        }

        if let Some(parent) = dest.parent() {
            self.fs.create_dir_all(parent).map_err(cannot_move)?;
        }
        self.move_entry(&source, &dest).map_err(cannot_move)?;

        self.fs
            .symlink(&dest, &source)
            .map_err(|source_err| DotfilesError::CannotSymlink {
                link: source.clone(),
                target: dest.clone(),
                source: source_err,
            })?;
        Ok(true)
    }

    fn same_file(&self, a: &Path, b: &Path) -> bool {
        match (self.fs.canonicalize(a), self.fs.canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Rename, falling back to copy-then-delete across filesystems.
    fn move_entry(&self, from: &Path, to: &Path) -> io::Result<()> {
        match self.fs.rename(from, to) {
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!("{} is on another filesystem, copying", from.display());
                if let Err(copy_err) = self.fs.copy_recursive(from, to) {
                    let _ = self.fs.remove_all(to);
                    return Err(copy_err);
                }
                self.fs.remove_all(from)
            }
            other => other,
        }
    }

    /// Verify `repository` is reachable and make it the mirror's `origin`.
    ///
    /// The remote is never created.
    ///
    /// # Errors
    ///
    /// * [`DotfilesError::RepositoryUnavailable`] when `git ls-remote` fails;
    /// * [`DotfilesError::GitStageFailed`] with [`GitStage::Remote`].
    pub fn ensure_remote(&self, repository: &str, dir: &Path) -> Result<(), DotfilesError> {
        let heads = git_in(dir).args(["ls-remote", "--heads", repository]);
        self.executor
            .run_or_die(&heads)
            .map_err(|source| DotfilesError::RepositoryUnavailable {
                repository: repository.to_string(),
                source,
            })?;

        let set_url = git_in(dir).args(["remote", "set-url", "origin", repository]);
        if self.executor.run_or_die(&set_url).is_err() {
            let add = git_in(dir).args(["remote", "add", "origin", repository]);
            self.git(GitStage::Remote, dir, &add)?;
        }

        self.advance(SyncStage::RemoteVerified);
        Ok(())
    }

    /// Stage everything, commit and force-push to `origin`.
    ///
    /// A blank `message` commits with [`DEFAULT_SAVE_MESSAGE`].  The commit is
    /// allowed to be empty so that repeated saves succeed.
    ///
    /// # Errors
    ///
    /// Returns [`DotfilesError::GitStageFailed`] labelled with the first
    /// stage that failed; later stages are not attempted.
    pub fn persist(&self, message: &str, dir: &Path) -> Result<(), DotfilesError> {
        let message = if message.trim().is_empty() {
            DEFAULT_SAVE_MESSAGE
        } else {
            message
        };

        self.git(GitStage::Stage, dir, &git_in(dir).args(["add", "-A"]))?;
        self.git(
            GitStage::Commit,
            dir,
            &git_in(dir).args(["commit", "--allow-empty", "-m", message]),
        )?;
        let refspec = format!("HEAD:{DEFAULT_BRANCH}");
        self.git(
            GitStage::Push,
            dir,
            &git_in(dir)
                .args(["push", "--force", "origin", refspec.as_str()])
                .with_stdio(StdioMode::Interactive),
        )?;

        self.advance(SyncStage::Persisted);
        Ok(())
    }

    /// Run the whole save pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first stage's error;
    /// [`DotfilesError::RepositoryNotConfigured`] when no repository is set.
    pub fn save(&self, request: &SaveRequest<'_>) -> Result<(), DotfilesError> {
        self.ensure_dir(request.dir)?;
        self.import(request.selected, request.dir)?;
        let repository = request
            .repository
            .ok_or(DotfilesError::RepositoryNotConfigured)?;
        self.ensure_remote(repository, request.dir)?;
        self.persist(request.message, request.dir)
    }

    /// Clone the mirror if needed and link its entries into the home
    /// directory.
    ///
    /// Returns `None` when no repository is configured.  Entries already
    /// linked are left alone; occupied locations are reported and skipped.
    ///
    /// # Errors
    ///
    /// * [`DotfilesError::GitStageFailed`] with [`GitStage::Clone`];
    /// * [`DotfilesError::PermissionDenied`] / [`DotfilesError::Io`] when the
    ///   mirror's parent or listing fails;
    /// * [`DotfilesError::CannotSymlink`].
    pub fn restore(
        &self,
        repository: Option<&str>,
        dir: &Path,
    ) -> Result<Option<RestoreReport>, DotfilesError> {
        let Some(repository) = repository else {
            tracing::debug!("no dotfiles repository configured, skipping restore");
            return Ok(None);
        };

        let mut report = RestoreReport::default();
        if !self.fs.is_dir(dir) {
            if let Some(parent) = dir.parent() {
                self.fs
                    .create_dir_all(parent)
                    .map_err(|source| dir_error(parent, source))?;
            }
            let clone = ExecCommand::new("git")
                .args(["clone", repository])
                .arg(dir.display().to_string())
                .with_stdio(StdioMode::Interactive);
            self.git(GitStage::Clone, dir, &clone)?;
            report.cloned = true;
        }

        self.link_back(dir, Path::new(""), &mut report)?;
        Ok(Some(report))
    }

    /// Link every entry of `mirror/rel` into `home/rel`.
    ///
    /// A mirror directory whose home counterpart is a real directory (as
    /// with `.config` after importing `.config/nvim`) is descended into
    /// instead of being reported as occupied.
    fn link_back(
        &self,
        mirror: &Path,
        rel: &Path,
        report: &mut RestoreReport,
    ) -> Result<(), DotfilesError> {
        let here = mirror.join(rel);
        let entries = self
            .fs
            .read_dir(&here)
            .map_err(|source| dir_error(&here, source))?;
        for entry in entries {
            let Some(file_name) = entry.file_name() else {
                continue;
            };
            if rel.as_os_str().is_empty() && MIRROR_METADATA.iter().any(|m| *file_name == **m) {
                continue;
            }
            let rel_entry = rel.join(file_name);
            let name = rel_entry.to_string_lossy().into_owned();
            let link = self.home.join(&rel_entry);

            if self.fs.is_symlink(&link) || self.fs.exists(&link) {
                if self.same_file(&link, &entry) {
                    continue;
                }
                if !self.fs.is_symlink(&link) && self.fs.is_dir(&link) && self.fs.is_dir(&entry) {
                    self.link_back(mirror, &rel_entry, report)?;
                } else {
                    tracing::warn!("{} is occupied, not linking {name}", link.display());
                    report.occupied.push(name);
                }
                continue;
            }
            self.fs
                .symlink(&entry, &link)
                .map_err(|source| DotfilesError::CannotSymlink {
                    link: link.clone(),
                    target: entry.clone(),
                    source,
                })?;
            tracing::info!("linked {name}");
            report.linked.push(name);
        }
        Ok(())
    }

    fn git(&self, stage: GitStage, dir: &Path, cmd: &ExecCommand) -> Result<(), DotfilesError> {
        tracing::debug!(stage = %stage, "{}", cmd.label());
        self.executor
            .run_or_die(cmd)
            .map_err(|source: ExecError| DotfilesError::GitStageFailed {
                stage,
                dir: dir.to_path_buf(),
                source,
            })
    }
}

fn dir_error(path: &Path, source: io::Error) -> DotfilesError {
    if source.kind() == io::ErrorKind::PermissionDenied {
        DotfilesError::PermissionDenied {
            path: path.to_path_buf(),
            source,
        }
    } else {
        DotfilesError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
