#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `save` command: import into the mirror, remote
//! verification and the stage/commit/push pipeline.

mod common;

use std::path::{Path, PathBuf};

use common::*;
use devsetup_cli::cli::SaveOpts;
use devsetup_cli::commands;
use devsetup_cli::dotfiles::GitStage;
use devsetup_cli::error::{DotfilesError, SetupError};
use devsetup_cli::exec::StdioMode;
use devsetup_cli::logging::TaskStatus;
use devsetup_cli::operations::FileSystemOps;
use devsetup_cli::platform::Os;
use devsetup_cli::setup;

const REPO: &str = "git@example.com:dev/dotfiles.git";

fn with_repo() -> String {
    format!("[dotfiles]\nrepository = \"{REPO}\"\n")
}

fn selected(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

fn home(name: &str) -> PathBuf {
    Path::new(HOME).join(name)
}

fn mirror(name: &str) -> PathBuf {
    Path::new(MIRROR).join(name)
}

#[test]
fn save_moves_dotfile_and_links_it_back() {
    let m = MachineBuilder::new(Os::Linux)
        .config(&with_repo())
        .home_file(".vimrc", "set number\n")
        .build();

    let opts = SaveOpts {
        dotfiles: selected(&[".vimrc"]),
        message: None,
    };
    commands::save::run(&m.ctx, &opts).unwrap();

    assert_eq!(m.fs.read(&mirror(".vimrc")).unwrap(), b"set number\n");
    assert!(m.fs.is_symlink(&home(".vimrc")));
    assert_eq!(m.fs.read_link(&home(".vimrc")).unwrap(), mirror(".vimrc"));
    assert_eq!(m.fs.read(&home(".vimrc")).unwrap(), b"set number\n");
    assert!(m.fs.exists(&mirror(".gitignore")));
}

#[test]
fn save_runs_git_pipeline_in_order_with_default_message() {
    let m = MachineBuilder::new(Os::Linux)
        .config(&with_repo())
        .home_file(".zshrc", "autoload -U compinit\n")
        .build();

    setup::save(&m.ctx, &[], None).unwrap();

    assert_eq!(
        m.exec.git_labels(),
        [
            "git init --initial-branch=main".to_string(),
            format!("git ls-remote --heads {REPO}"),
            format!("git remote set-url origin {REPO}"),
            "git add -A".to_string(),
            "git commit --allow-empty -m Update dotfiles".to_string(),
            "git push --force origin HEAD:main".to_string(),
        ]
    );
    assert_eq!(m.exec.modes().last(), Some(&StdioMode::Interactive));
    assert!(m.fs.is_symlink(&home(".zshrc")));
}

#[test]
fn save_on_read_only_filesystem_is_permission_denied_without_git() {
    let m = MachineBuilder::new(Os::Linux)
        .config(&with_repo())
        .home_file(".vimrc", "set number\n")
        .with_fs(devsetup_cli::operations::MemoryFileSystemOps::read_only)
        .build();

    let err = setup::save(&m.ctx, &[], None).unwrap_err();

    assert!(matches!(
        err,
        SetupError::Dotfiles(DotfilesError::PermissionDenied { .. })
    ));
    assert!(m.exec.labels().is_empty());
    assert!(!m.fs.is_symlink(&home(".vimrc")));
}

#[test]
fn push_failure_is_labelled_push() {
    let m = MachineBuilder::new(Os::Linux)
        .config(&with_repo())
        .failing_on(&["push"])
        .build();

    let err = setup::save(&m.ctx, &[], Some("Tweak prompt")).unwrap_err();

    assert!(
        matches!(&err, SetupError::Dotfiles(e) if e.git_stage() == Some(GitStage::Push)),
        "unexpected error: {err}"
    );
    assert!(
        m.exec
            .git_labels()
            .contains(&"git commit --allow-empty -m Tweak prompt".to_string())
    );
}

#[test]
fn commit_failure_stops_before_push() {
    let m = MachineBuilder::new(Os::Linux)
        .config(&with_repo())
        .failing_on(&["commit"])
        .build();

    let err = setup::save(&m.ctx, &[], None).unwrap_err();

    assert!(matches!(
        err,
        SetupError::Dotfiles(DotfilesError::GitStageFailed {
            stage: GitStage::Commit,
            ..
        })
    ));
    assert!(!m.exec.labels().iter().any(|l| l.contains("push")));
}

#[test]
fn missing_dotfile_cannot_be_moved_and_leaves_no_symlink() {
    let m = MachineBuilder::new(Os::Linux).config(&with_repo()).build();

    let err = setup::save(&m.ctx, &selected(&[".nope"]), None).unwrap_err();

    assert!(matches!(
        err,
        SetupError::Dotfiles(DotfilesError::CannotMoveDotfile { ref name, .. }) if name == ".nope"
    ));
    assert!(!m.fs.exists(&home(".nope")));
    assert!(!m.fs.is_symlink(&home(".nope")));
    assert!(!m.exec.labels().iter().any(|l| l.contains("ls-remote")));
}

#[test]
fn unreachable_repository_is_reported() {
    let m = MachineBuilder::new(Os::Linux)
        .config(&with_repo())
        .failing_on(&["ls-remote"])
        .build();

    let err = setup::save(&m.ctx, &[], None).unwrap_err();

    assert!(matches!(
        err,
        SetupError::Dotfiles(DotfilesError::RepositoryUnavailable { .. })
    ));
}

#[test]
fn missing_repository_fails_after_import() {
    let m = MachineBuilder::new(Os::Linux)
        .home_file(".gitconfig", "[user]\n")
        .build();

    let err = setup::save(&m.ctx, &[], None).unwrap_err();

    assert!(matches!(
        err,
        SetupError::Dotfiles(DotfilesError::RepositoryNotConfigured)
    ));
    assert!(m.fs.is_symlink(&home(".gitconfig")));
}

#[test]
fn configured_message_is_used_when_none_given() {
    let config = format!("default_save_message = \"Nightly sync\"\n\n{}", with_repo());
    let m = MachineBuilder::new(Os::Linux).config(&config).build();

    commands::save::run(&m.ctx, &SaveOpts::default()).unwrap();

    assert!(
        m.exec
            .git_labels()
            .contains(&"git commit --allow-empty -m Nightly sync".to_string())
    );
    let tasks = m.log.task_entries();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Ok);
}

#[test]
fn failed_save_is_recorded_for_the_summary() {
    let m = MachineBuilder::new(Os::Linux)
        .config(&with_repo())
        .failing_on(&["push"])
        .build();

    assert!(commands::save::run(&m.ctx, &SaveOpts::default()).is_err());
    assert_eq!(m.log.failure_count(), 1);
}

#[test]
fn repositories_path_moves_the_mirror() {
    let config = format!("repositories_path = \"~/code\"\n\n{}", with_repo());
    let m = MachineBuilder::new(Os::MacOs)
        .config(&config)
        .home_file(".tmux.conf", "set -g mouse on\n")
        .build();

    setup::save(&m.ctx, &selected(&[".tmux.conf"]), None).unwrap();

    let moved = Path::new(HOME).join("code/dotfiles/.tmux.conf");
    assert_eq!(m.fs.read(&moved).unwrap(), b"set -g mouse on\n");
    assert_eq!(m.fs.read_link(&home(".tmux.conf")).unwrap(), moved);
}
