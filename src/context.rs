//! The per-run [`Context`] shared by every command.
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::Config;
use crate::dotfiles::DotfilesSynchronizer;
use crate::error::ConfigError;
use crate::exec::{CancelToken, Executor};
use crate::logging::Log;
use crate::managers::{ManagerEnv, ManagerRegistry};
use crate::operations::FileSystemOps;
use crate::platform::Platform;
use crate::presets::{Prompt, TerminalPrompt};

/// Everything a command needs, built once at startup and passed down
/// explicitly.
#[derive(Debug)]
pub struct Context {
    /// Configuration as last loaded from [`config_path`](Self::config_path).
    ///
    /// Use [`Context::config_read`] for read access; setup reloads it after
    /// restoring the dotfiles mirror.
    pub config: RwLock<Config>,
    /// Location of `config.toml`.
    pub config_path: PathBuf,
    /// Detected platform information.
    pub platform: Platform,
    /// User's home directory path.
    pub home: PathBuf,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Filesystem operation abstraction (injectable for testing).
    pub fs: Arc<dyn FileSystemOps>,
    /// All compiled-in package managers.
    pub registry: ManagerRegistry,
    /// Save/restore pipeline for the dotfiles mirror.
    pub dotfiles: DotfilesSynchronizer,
    /// Preset chooser used when the manifest is empty.
    pub prompt: Box<dyn Prompt>,
    /// Set from the Ctrl-C handler.
    pub cancel: CancelToken,
}

impl Context {
    /// Load the configuration at `config_path` and wire up the registry and
    /// synchronizer around the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration exists but cannot be
    /// read or parsed.
    pub fn new(
        home: PathBuf,
        config_path: PathBuf,
        platform: Platform,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        fs: Arc<dyn FileSystemOps>,
    ) -> Result<Self, ConfigError> {
        let config = Config::load(fs.as_ref(), &config_path)?;
        let env = ManagerEnv::new(Arc::clone(&executor), Arc::clone(&fs), platform);
        let dotfiles =
            DotfilesSynchronizer::new(home.clone(), Arc::clone(&fs), Arc::clone(&executor));

        Ok(Self {
            config: RwLock::new(config),
            config_path,
            platform,
            home,
            log,
            executor,
            fs,
            registry: ManagerRegistry::new(&env),
            dotfiles,
            prompt: Box::new(TerminalPrompt),
            cancel: CancelToken::new(),
        })
    }

    /// Replace the preset chooser.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Share `cancel` with this context (and whatever executor holds it).
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Acquire a shared read lock on the configuration.
    ///
    /// Recovers from a poisoned lock by consuming the poison and returning
    /// the inner value.
    pub fn config_read(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn config_write(&self) -> RwLockWriteGuard<'_, Config> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-read the configuration file, replacing the in-memory copy.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed; the
    /// previous configuration is kept in that case.
    pub fn reload_config(&self) -> Result<(), ConfigError> {
        let fresh = Config::load(self.fs.as_ref(), &self.config_path)?;
        *self.config_write() = fresh;
        Ok(())
    }

    /// Apply `change` to a copy of the configuration, write the copy to
    /// disk, and only then make it the in-memory configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be written; the
    /// in-memory configuration is unchanged in that case.
    pub fn update_config<T>(&self, change: impl FnOnce(&mut Config) -> T) -> Result<T, ConfigError> {
        let mut config = self.config_write();
        let mut updated = config.clone();
        let out = change(&mut updated);
        updated.save(self.fs.as_ref(), &self.config_path)?;
        *config = updated;
        Ok(out)
    }

    /// The dotfiles mirror directory for the current configuration.
    #[must_use]
    pub fn dotfiles_dir(&self) -> PathBuf {
        self.config_read().dotfiles_dir(&self.home)
    }

    /// Whether the run has been interrupted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
