#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `setup` and `restore` commands.

mod common;

use std::path::Path;

use common::*;
use devsetup_cli::commands;
use devsetup_cli::error::{PackageManagerError, SetupError};
use devsetup_cli::logging::TaskStatus;
use devsetup_cli::managers::homebrew::BREW_PATH;
use devsetup_cli::managers::language::PIP_PATH;
use devsetup_cli::managers::system::{APT_PATH, YUM_PATH};
use devsetup_cli::operations::FileSystemOps;
use devsetup_cli::platform::Os;
use devsetup_cli::setup;

#[test]
fn batch_install_continues_past_failing_package() {
    let m = MachineBuilder::new(Os::Linux)
        .installed(&[APT_PATH])
        .config("[packages]\napt = [\"pkgA\", \"pkgB\"]\n")
        .failing_on(&["pkgA"])
        .build();

    commands::setup::run(&m.ctx, false).unwrap();

    assert_eq!(
        m.exec.labels(),
        [
            format!("sudo {APT_PATH} install -y pkgA"),
            format!("sudo {APT_PATH} install -y pkgB"),
        ]
    );
    let tasks = m.log.task_entries();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].status, TaskStatus::Failed);
    assert_eq!(tasks[1].status, TaskStatus::Ok);
    assert!(commands::finish(&m.log).is_err());
}

#[test]
fn install_packages_reports_installed_and_failed() {
    let m = MachineBuilder::new(Os::Linux)
        .installed(&[PIP_PATH])
        .failing_on(&["pkgA"])
        .build();
    let pip = m.ctx.registry.get("pip").unwrap();

    let summary = setup::install_packages(&m.ctx, pip, &["pkgA".into(), "pkgB".into()]);

    assert_eq!(summary.installed, ["pkgB"]);
    assert_eq!(summary.failed, ["pkgA"]);
}

#[test]
fn empty_manifest_prompts_and_saves_preset_for_os_manager() {
    let m = MachineBuilder::new(Os::MacOs)
        .installed(&[BREW_PATH])
        .answer(0)
        .build();

    let report = setup::setup(&m.ctx, m.ctx.registry.os_primary()).unwrap();

    assert_eq!(report.preset, Some("generalist"));
    let saved = String::from_utf8(m.fs.read(Path::new(CONFIG)).unwrap()).unwrap();
    assert!(saved.contains("brew = ["));
    assert!(saved.contains("cask = ["));
    assert!(m.exec.labels().contains(&"brew install ripgrep".to_string()));
    assert!(
        m.exec
            .labels()
            .contains(&"brew install --cask iterm2".to_string())
    );
}

#[test]
fn declined_preset_is_fatal() {
    let m = MachineBuilder::new(Os::Linux).installed(&[YUM_PATH]).build();

    let err = setup::setup(&m.ctx, m.ctx.registry.os_primary()).unwrap_err();

    assert!(matches!(err, SetupError::Prompt(_)));
    assert!(m.exec.labels().is_empty());
}

#[test]
fn missing_os_manager_that_cannot_bootstrap_is_fatal() {
    let m = MachineBuilder::new(Os::Linux)
        .config("[packages]\napt = [\"jq\"]\n")
        .build();

    let err = commands::setup::run(&m.ctx, false).unwrap_err();
    let err = err.downcast::<SetupError>().unwrap();

    assert!(matches!(
        err,
        SetupError::Bootstrap {
            source: PackageManagerError::NotFound { .. },
            ..
        }
    ));
    assert!(m.exec.labels().is_empty());
}

#[test]
fn restore_links_existing_mirror_entries() {
    let m = MachineBuilder::new(Os::Linux)
        .installed(&[APT_PATH])
        .config("[dotfiles]\nrepository = \"r\"\n\n[packages]\napt = [\"git\"]\n")
        .with_fs(|fs| {
            fs.with_dir(Path::new(MIRROR).join(".git"))
                .with_file(Path::new(MIRROR).join(".bashrc"), "alias ll='ls -l'\n")
        })
        .build();

    let report = setup::restore(&m.ctx, m.ctx.registry.os_primary()).unwrap();

    let restored = report.restored.unwrap();
    assert!(!restored.cloned);
    assert_eq!(restored.linked, [".bashrc"]);
    let link = Path::new(HOME).join(".bashrc");
    assert!(m.fs.is_symlink(&link));
    assert_eq!(m.fs.read(&link).unwrap(), b"alias ll='ls -l'\n");
    assert!(!m.fs.exists(&Path::new(HOME).join(".git")));
}

#[test]
fn restore_reports_occupied_locations() {
    let m = MachineBuilder::new(Os::Linux)
        .installed(&[APT_PATH])
        .config("[dotfiles]\nrepository = \"r\"\n\n[packages]\napt = [\"git\"]\n")
        .home_file(".bashrc", "local\n")
        .with_fs(|fs| fs.with_file(Path::new(MIRROR).join(".bashrc"), "mirrored\n"))
        .build();

    let report = setup::restore(&m.ctx, m.ctx.registry.os_primary()).unwrap();

    assert_eq!(report.restored.unwrap().occupied, [".bashrc"]);
    assert_eq!(
        m.fs.read(&Path::new(HOME).join(".bashrc")).unwrap(),
        b"local\n"
    );
    assert!(
        m.log
            .task_entries()
            .iter()
            .any(|t| t.name == "link .bashrc" && t.status == TaskStatus::Skipped)
    );
}

#[test]
fn restore_clones_missing_mirror_and_keeps_going_on_failure() {
    let m = MachineBuilder::new(Os::Linux)
        .installed(&[APT_PATH])
        .config("[dotfiles]\nrepository = \"git@example.com:dev/dotfiles.git\"\n\n[packages]\napt = [\"git\"]\n")
        .failing_on(&["clone"])
        .build();

    commands::setup::run(&m.ctx, true).unwrap();

    let labels = m.exec.labels();
    assert!(labels[0].starts_with("git clone git@example.com:dev/dotfiles.git"));
    assert_eq!(labels[1], format!("sudo {APT_PATH} install -y git"));
}

#[test]
fn cancelled_run_installs_nothing() {
    let m = MachineBuilder::new(Os::Linux)
        .installed(&[APT_PATH])
        .config("[packages]\napt = [\"jq\"]\n")
        .build();
    m.ctx.cancel.cancel();

    let report = setup::setup(&m.ctx, m.ctx.registry.os_primary()).unwrap();

    assert!(report.installs.is_empty());
    assert!(m.exec.labels().is_empty());
}
