//! Developer environment bootstrapper.
//!
//! Detects the host's package manager, installs a declared set of CLI and
//! GUI packages across eight package managers, and keeps a dotfiles
//! directory mirrored to a remote git repository.
//!
//! The public API is organised into layers:
//!
//! - **[`exec`]** and **[`operations`]**: process and filesystem seams
//!   (injectable for tests)
//! - **[`managers`]**: the package manager contract, its eight variants and
//!   the registry that resolves the OS package manager
//! - **[`dotfiles`]**: the save/restore pipeline for the dotfiles mirror
//! - **[`setup`]**: orchestration of bootstrap, restore, presets and installs
//! - **[`commands`]**: top-level subcommand handlers
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod dotfiles;
pub mod error;
pub mod exec;
pub mod logging;
pub mod managers;
pub mod operations;
pub mod platform;
pub mod presets;
pub mod setup;
