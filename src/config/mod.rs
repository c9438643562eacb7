//! User configuration: dotfiles repository, mirror location and the package
//! manifest, stored as TOML.
//!
//! ```toml
//! repositories_path = "~/src"
//! default_save_message = "Sync dotfiles"
//!
//! [dotfiles]
//! repository = "git@github.com:me/dotfiles.git"
//!
//! [packages]
//! brew = ["git", "ripgrep"]
//! ```
pub mod manifest;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::operations::FileSystemOps;

pub use manifest::Manifest;

/// Name of the mirror directory inside `repositories_path`.
pub const DOTFILES_DIR_NAME: &str = "dotfiles";

/// Default parent directory for the mirror, relative to the home directory.
const DEFAULT_REPOSITORIES_PATH: &str = "~/src";

/// `[dotfiles]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DotfilesSettings {
    /// Remote repository the mirror is pushed to and cloned from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// Everything read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Parent directory of the dotfiles mirror (`~/` is expanded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repositories_path: Option<String>,
    /// Commit message used by `save` when none is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_save_message: Option<String>,
    /// Dotfiles repository settings.
    pub dotfiles: DotfilesSettings,
    /// Packages to install, per manager.
    pub packages: Manifest,
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the default (empty) configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file exists but cannot be read and
    /// [`ConfigError::Parse`] if it is not valid configuration TOML.
    pub fn load(fs: &dyn FileSystemOps, path: &Path) -> Result<Self, ConfigError> {
        if !fs.exists(path) {
            tracing::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let bytes = fs.read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write configuration to `path`, creating its parent directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] or [`ConfigError::Write`].
    pub fn save(&self, fs: &dyn FileSystemOps, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs.create_dir_all(parent).map_err(write_err)?;
        }
        fs.write(path, content.as_bytes()).map_err(write_err)
    }

    /// Parent directory of the mirror, with `~/` expanded against `home`.
    #[must_use]
    pub fn repositories_path(&self, home: &Path) -> PathBuf {
        expand_tilde(
            self.repositories_path
                .as_deref()
                .unwrap_or(DEFAULT_REPOSITORIES_PATH),
            home,
        )
    }

    /// The dotfiles mirror directory: `<repositories_path>/dotfiles`.
    #[must_use]
    pub fn dotfiles_dir(&self, home: &Path) -> PathBuf {
        self.repositories_path(home).join(DOTFILES_DIR_NAME)
    }

    /// The configured remote, ignoring blank values.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        self.dotfiles
            .repository
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    /// Resolve the commit message: explicit, then configured default, then
    /// empty (the synchronizer substitutes its own default).
    #[must_use]
    pub fn save_message(&self, explicit: Option<&str>) -> String {
        explicit
            .filter(|m| !m.trim().is_empty())
            .or(self.default_save_message.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// Expand a leading `~` or `~/` against `home`.
#[must_use]
pub fn expand_tilde(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        home.to_path_buf()
    } else if let Some(rest) = value.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(value)
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/devsetup/config.toml`,
/// falling back to `~/.config/devsetup/config.toml`.
#[must_use]
pub fn default_path(home: &Path) -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map_or_else(|| home.join(".config"), PathBuf::from)
        .join("devsetup")
        .join("config.toml")
}
