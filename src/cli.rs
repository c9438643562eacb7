//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI entry point for the developer environment bootstrapper.
#[derive(Parser, Debug)]
#[command(
    name = "devsetup",
    about = "Bootstrap a developer machine: packages and dotfiles",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Path to config.toml (default: $XDG_CONFIG_HOME/devsetup/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bootstrap the OS package manager, restore dotfiles and install packages
    Setup,
    /// Same as setup, starting from an existing dotfiles repository
    Restore,
    /// Move dotfiles into the mirror, commit and push
    Save(SaveOpts),
    /// Install packages and add them to the manifest
    Install(PackageOpts),
    /// Uninstall packages and remove them from the manifest
    Uninstall(PackageOpts),
    /// Update packages (all packages when none are named)
    Update(PackageOpts),
    /// Upgrade packages (all packages when none are named)
    Upgrade(PackageOpts),
    /// Remove caches and unused dependencies
    Cleanup(ManagerOpts),
    /// List the known package managers
    Managers,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Restore => "restore",
            Self::Save(_) => "save",
            Self::Install(_) => "install",
            Self::Uninstall(_) => "uninstall",
            Self::Update(_) => "update",
            Self::Upgrade(_) => "upgrade",
            Self::Cleanup(_) => "cleanup",
            Self::Managers => "managers",
            Self::Version => "version",
        }
    }
}

/// Options for the `save` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SaveOpts {
    /// Dotfiles to import, relative to the home directory (default: all
    /// hidden entries)
    #[arg(value_name = "DOTFILE")]
    pub dotfiles: Vec<String>,

    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,
}

/// Selects a package manager.
#[derive(Args, Debug, Clone, Default)]
pub struct ManagerOpts {
    /// Package manager to use (default: the OS package manager)
    #[arg(short = 'p', long, value_name = "NAME")]
    pub manager: Option<String>,
}

/// Options for the per-package subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct PackageOpts {
    /// Manager selection.
    #[command(flatten)]
    pub manager: ManagerOpts,

    /// Packages to act on
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,
}
