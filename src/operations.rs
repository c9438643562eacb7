//! Filesystem operation abstractions for dependency injection.
//!
//! Provides the [`FileSystemOps`] trait so that the package managers, the
//! dotfiles synchronizer and the configuration loader can be exercised
//! without touching the real filesystem.  Production code uses
//! [`SystemFileSystemOps`]; tests use [`MemoryFileSystemOps`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Abstraction over every filesystem access the bootstrapper performs.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists, following symlinks.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    /// Returns `true` if `path` itself is a symbolic link.
    fn is_symlink(&self, path: &Path) -> bool;

    /// Returns the immediate child paths inside `path`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` cannot be read as a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Read the target of the symbolic link at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not a symlink.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Read the full contents of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate the file at `path` with `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory is missing or not writable.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Create `path` and all missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Rename `from` to `to` (same filesystem only).
    ///
    /// # Errors
    ///
    /// Returns an error if `from` is missing or the rename crosses devices.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy a file, symlink or directory tree from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry cannot be read or written.
    fn copy_recursive(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove the file, symlink or directory tree at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    /// Create a symbolic link at `link` pointing to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if something already exists at `link`.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Resolve `path` to an absolute path with every symlink followed.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not exist.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok_and(|m| m.is_symlink())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = std::fs::read_dir(path)?
            .map(|e| e.map(|entry| entry.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy_recursive(&self, from: &Path, to: &Path) -> io::Result<()> {
        let meta = std::fs::symlink_metadata(from)?;
        if meta.is_symlink() {
            let target = std::fs::read_link(from)?;
            return create_symlink(&target, to);
        }
        if meta.is_dir() {
            std::fs::create_dir_all(to)?;
            for entry in std::fs::read_dir(from)? {
                let entry = entry?;
                self.copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
            }
            return Ok(());
        }
        std::fs::copy(from, to).map(|_| ())
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let meta = std::fs::symlink_metadata(path)?;
        if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        create_symlink(target, link)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        dunce::canonicalize(path)
    }
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        }
    }
}

/// Maximum symlink hops followed before giving up (mirrors `ELOOP`).
const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: BTreeMap<PathBuf, Node>,
    read_only: bool,
    cross_device: bool,
    deny_symlinks: bool,
}

/// In-memory [`FileSystemOps`] used by tests.
///
/// Paths are expected to be absolute.  Symlinks are followed for reads and
/// existence checks the way the kernel would.  The filesystem can be made
/// read-only (every mutation fails with `PermissionDenied`) or made to refuse
/// renames as cross-device moves, or to refuse symlink creation.
///
/// # Example
///
/// ```
/// use devsetup_cli::operations::{FileSystemOps, MemoryFileSystemOps};
/// use std::path::Path;
///
/// let fs = MemoryFileSystemOps::new()
///     .with_file("/home/me/.bashrc", "export EDITOR=vim\n");
/// assert!(fs.exists(Path::new("/home/me/.bashrc")));
/// assert!(fs.is_dir(Path::new("/home/me")));
/// ```
#[derive(Debug, Default)]
pub struct MemoryFileSystemOps {
    state: Mutex<MemoryState>,
}

impl MemoryFileSystemOps {
    /// Create an empty filesystem containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock().nodes.insert(PathBuf::from("/"), Node::Dir);
        fs
    }

    /// Add a file (and its ancestors).
    #[must_use]
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
        {
            let mut state = self.lock();
            let path = path.as_ref();
            insert_ancestors(&mut state.nodes, path);
            state
                .nodes
                .insert(path.to_path_buf(), Node::File(contents.as_ref().to_vec()));
        }
        self
    }

    /// Add a directory (and its ancestors).
    #[must_use]
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        {
            let mut state = self.lock();
            let path = path.as_ref();
            insert_ancestors(&mut state.nodes, path);
            state.nodes.insert(path.to_path_buf(), Node::Dir);
        }
        self
    }

    /// Add a symlink at `link` pointing to `target`.
    #[must_use]
    pub fn with_symlink(self, link: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        {
            let mut state = self.lock();
            let link = link.as_ref();
            insert_ancestors(&mut state.nodes, link);
            state.nodes.insert(
                link.to_path_buf(),
                Node::Symlink(target.as_ref().to_path_buf()),
            );
        }
        self
    }

    /// Make every subsequent mutation fail with `PermissionDenied`.
    #[must_use]
    pub fn read_only(self) -> Self {
        self.lock().read_only = true;
        self
    }

    /// Make every subsequent rename fail as a cross-device move.
    #[must_use]
    pub fn cross_device(self) -> Self {
        self.lock().cross_device = true;
        self
    }

    /// Make every subsequent symlink creation fail with `PermissionDenied`.
    #[must_use]
    pub fn deny_symlinks(self) -> Self {
        self.lock().deny_symlinks = true;
        self
    }

    /// Sorted list of every path currently present (test inspection).
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().nodes.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn writable(&self) -> io::Result<MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        if state.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only filesystem",
            ));
        }
        Ok(state)
    }
}

fn insert_ancestors(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        nodes
            .entry(ancestor.to_path_buf())
            .or_insert(Node::Dir);
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

/// Follow every symlink in `path`, including the final component.
fn resolve(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> PathBuf {
    let mut current = PathBuf::new();
    let mut pending: Vec<OsString> = path
        .components()
        .rev()
        .map(|c| c.as_os_str().to_os_string())
        .collect();
    let mut hops = 0;
    while let Some(part) = pending.pop() {
        current.push(&part);
        if let Some(Node::Symlink(target)) = nodes.get(&current)
            && hops < MAX_SYMLINK_HOPS
        {
            hops += 1;
            let target = if target.is_absolute() {
                target.clone()
            } else {
                current
                    .parent()
                    .unwrap_or_else(|| Path::new("/"))
                    .join(target)
            };
            current = PathBuf::new();
            pending.extend(
                target
                    .components()
                    .rev()
                    .map(|c| c.as_os_str().to_os_string()),
            );
        }
    }
    current
}

/// Follow symlinks in the parent of `path` but not in its final component.
fn resolve_parent(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => resolve(nodes, parent).join(name),
        _ => path.to_path_buf(),
    }
}

fn subtree(nodes: &BTreeMap<PathBuf, Node>, root: &Path) -> Vec<(PathBuf, Node)> {
    nodes
        .iter()
        .filter(|(p, _)| p.starts_with(root))
        .map(|(p, n)| (p.clone(), n.clone()))
        .collect()
}

fn require_parent_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => match nodes.get(parent) {
            Some(Node::Dir) => Ok(()),
            _ => Err(not_found(parent)),
        },
        _ => Ok(()),
    }
}

impl FileSystemOps for MemoryFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.nodes.contains_key(&resolve(&state.nodes, path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.lock();
        matches!(
            state.nodes.get(&resolve(&state.nodes, path)),
            Some(Node::Dir)
        )
    }

    fn is_symlink(&self, path: &Path) -> bool {
        let state = self.lock();
        matches!(
            state.nodes.get(&resolve_parent(&state.nodes, path)),
            Some(Node::Symlink(_))
        )
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.lock();
        let dir = resolve(&state.nodes, path);
        if !matches!(state.nodes.get(&dir), Some(Node::Dir)) {
            return Err(not_found(path));
        }
        Ok(state
            .nodes
            .keys()
            .filter(|p| p.parent() == Some(dir.as_path()))
            .filter_map(|p| p.file_name().map(|name| path.join(name)))
            .collect())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let state = self.lock();
        match state.nodes.get(&resolve_parent(&state.nodes, path)) {
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a symbolic link",
            )),
            None => Err(not_found(path)),
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.lock();
        match state.nodes.get(&resolve(&state.nodes, path)) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "is a directory",
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.writable()?;
        let target = resolve(&state.nodes, path);
        require_parent_dir(&state.nodes, &target)?;
        if matches!(state.nodes.get(&target), Some(Node::Dir)) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "is a directory",
            ));
        }
        state.nodes.insert(target, Node::File(contents.to_vec()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let resolved = {
            let state = self.lock();
            let resolved = resolve(&state.nodes, path);
            if matches!(state.nodes.get(&resolved), Some(Node::Dir)) {
                return Ok(());
            }
            resolved
        };
        let mut state = self.writable()?;
        for ancestor in resolved.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            match state.nodes.get(ancestor) {
                Some(Node::Dir) | None => {}
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("not a directory: {}", ancestor.display()),
                    ));
                }
            }
        }
        insert_ancestors(&mut state.nodes, &resolved);
        state.nodes.insert(resolved, Node::Dir);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.writable()?;
        if state.cross_device {
            return Err(io::Error::from(io::ErrorKind::CrossesDevices));
        }
        let from = resolve_parent(&state.nodes, from);
        let to = resolve_parent(&state.nodes, to);
        if !state.nodes.contains_key(&from) {
            return Err(not_found(&from));
        }
        require_parent_dir(&state.nodes, &to)?;
        for (path, node) in subtree(&state.nodes, &from) {
            state.nodes.remove(&path);
            let relative = path.strip_prefix(&from).unwrap_or_else(|_| Path::new(""));
            let moved = if relative.as_os_str().is_empty() {
                to.clone()
            } else {
                to.join(relative)
            };
            state.nodes.insert(moved, node);
        }
        Ok(())
    }

    fn copy_recursive(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.writable()?;
        let from = resolve_parent(&state.nodes, from);
        let to = resolve_parent(&state.nodes, to);
        if !state.nodes.contains_key(&from) {
            return Err(not_found(&from));
        }
        require_parent_dir(&state.nodes, &to)?;
        for (path, node) in subtree(&state.nodes, &from) {
            let relative = path.strip_prefix(&from).unwrap_or_else(|_| Path::new(""));
            let copied = if relative.as_os_str().is_empty() {
                to.clone()
            } else {
                to.join(relative)
            };
            state.nodes.insert(copied, node);
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.writable()?;
        let target = resolve_parent(&state.nodes, path);
        if !state.nodes.contains_key(&target) {
            return Err(not_found(path));
        }
        for (p, _) in subtree(&state.nodes, &target) {
            state.nodes.remove(&p);
        }
        Ok(())
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let mut state = self.writable()?;
        if state.deny_symlinks {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "symlinks not permitted",
            ));
        }
        let link = resolve_parent(&state.nodes, link);
        if state.nodes.contains_key(&link) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", link.display()),
            ));
        }
        require_parent_dir(&state.nodes, &link)?;
        state
            .nodes
            .insert(link, Node::Symlink(target.to_path_buf()));
        Ok(())
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let state = self.lock();
        let resolved = resolve(&state.nodes, path);
        if state.nodes.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(not_found(path))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // MemoryFileSystemOps
    // -----------------------------------------------------------------------

    #[test]
    fn memory_with_file_creates_ancestors() {
        let fs = MemoryFileSystemOps::new().with_file("/a/b/c.txt", "x");
        assert!(fs.is_dir(Path::new("/a")));
        assert!(fs.is_dir(Path::new("/a/b")));
        assert!(!fs.is_dir(Path::new("/a/b/c.txt")));
        assert_eq!(fs.read(Path::new("/a/b/c.txt")).unwrap(), b"x");
    }

    #[test]
    fn memory_read_dir_lists_immediate_children() {
        let fs = MemoryFileSystemOps::new()
            .with_file("/home/me/.bashrc", "")
            .with_file("/home/me/.config/nvim/init.lua", "")
            .with_file("/home/me/notes.txt", "");
        let entries = fs.read_dir(Path::new("/home/me")).unwrap();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/home/me/.bashrc"),
                PathBuf::from("/home/me/.config"),
                PathBuf::from("/home/me/notes.txt"),
            ]
        );
    }

    #[test]
    fn memory_symlinks_are_followed_for_reads() {
        let fs = MemoryFileSystemOps::new()
            .with_file("/mirror/.foo", "content")
            .with_symlink("/home/me/.foo", "/mirror/.foo");
        assert!(fs.is_symlink(Path::new("/home/me/.foo")));
        assert!(!fs.is_symlink(Path::new("/mirror/.foo")));
        assert_eq!(fs.read(Path::new("/home/me/.foo")).unwrap(), b"content");
        assert_eq!(
            fs.canonicalize(Path::new("/home/me/.foo")).unwrap(),
            PathBuf::from("/mirror/.foo")
        );
    }

    #[test]
    fn memory_symlinked_directories_are_traversed() {
        let fs = MemoryFileSystemOps::new()
            .with_file("/mirror/.config/app.toml", "k = 1")
            .with_symlink("/home/me/.config", "/mirror/.config");
        assert_eq!(
            fs.read(Path::new("/home/me/.config/app.toml")).unwrap(),
            b"k = 1"
        );
    }

    #[test]
    fn memory_rename_moves_subtree() {
        let fs = MemoryFileSystemOps::new()
            .with_file("/home/me/.config/a", "1")
            .with_file("/home/me/.config/sub/b", "2")
            .with_dir("/mirror");
        fs.rename(Path::new("/home/me/.config"), Path::new("/mirror/.config"))
            .unwrap();
        assert!(!fs.exists(Path::new("/home/me/.config")));
        assert_eq!(fs.read(Path::new("/mirror/.config/sub/b")).unwrap(), b"2");
    }

    #[test]
    fn memory_read_only_rejects_mutation() {
        let fs = MemoryFileSystemOps::new().read_only();
        let err = fs.create_dir_all(Path::new("/src/dotfiles")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn memory_cross_device_rename_fails() {
        let fs = MemoryFileSystemOps::new()
            .with_file("/home/me/.x", "")
            .with_dir("/mirror")
            .cross_device();
        let err = fs
            .rename(Path::new("/home/me/.x"), Path::new("/mirror/.x"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::CrossesDevices);
    }

    #[test]
    fn memory_symlink_refuses_existing_path() {
        let fs = MemoryFileSystemOps::new().with_file("/home/me/.x", "");
        let err = fs
            .symlink(Path::new("/mirror/.x"), Path::new("/home/me/.x"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn memory_write_requires_parent() {
        let fs = MemoryFileSystemOps::new();
        let err = fs.write(Path::new("/missing/file"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn memory_remove_all_removes_subtree() {
        let fs = MemoryFileSystemOps::new().with_file("/a/b/c", "x");
        fs.remove_all(Path::new("/a/b")).unwrap();
        assert!(!fs.exists(Path::new("/a/b/c")));
        assert!(fs.exists(Path::new("/a")));
    }

    // -----------------------------------------------------------------------
    // SystemFileSystemOps
    // -----------------------------------------------------------------------

    #[test]
    fn system_copy_recursive_copies_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("a.txt"), b"aaa").unwrap();
        std::fs::write(src.join("sub/b.txt"), b"bbb").unwrap();

        let dst = dir.path().join("dst");
        SystemFileSystemOps.copy_recursive(&src, &dst).unwrap();

        assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(dst.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[cfg(unix)]
    #[test]
    fn system_symlink_and_read_link() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        std::fs::write(&target, b"x").unwrap();

        let fs = SystemFileSystemOps;
        fs.symlink(&target, &link).unwrap();
        assert!(fs.is_symlink(&link));
        assert_eq!(fs.read_link(&link).unwrap(), target);
        assert_eq!(fs.read(&link).unwrap(), b"x");
    }

    #[test]
    fn system_remove_all_handles_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        let sub = dir.path().join("d");
        std::fs::write(&file, b"").unwrap();
        std::fs::create_dir_all(sub.join("inner")).unwrap();

        let fs = SystemFileSystemOps;
        fs.remove_all(&file).unwrap();
        fs.remove_all(&sub).unwrap();
        assert!(!file.exists());
        assert!(!sub.exists());
    }
}
