//! `GitCli` against a real repository in a temporary directory.
//!
//! Every test returns early when no `git` binary is available.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use gherkin_sync::git::{GitCli, Vcs};
use gherkin_sync_core::classify::{classify_diff, classify_initial, DEFAULT_EXTENSION};
use gherkin_sync_core::models::{FileChange, FileStatus};

const LOGIN: &str = "\
Feature: User Login

  Scenario: Successful login
    Given a registered user
    When they sign in
    Then the dashboard is shown
";

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write(dir: &Path, path: &str, content: &str) {
    let full = dir.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn setup_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    git(tmp.path(), &["init", "-q"]);
    write(tmp.path(), "features/auth/user_login.feature", LOGIN);
    write(tmp.path(), "README.md", "# project\n");
    git(tmp.path(), &["add", "."]);
    git(tmp.path(), &["commit", "-q", "-m", "initial"]);
    tmp
}

#[test]
fn test_head_and_tracked_files() {
    if !git_available() {
        return;
    }
    let tmp = setup_repo();
    let vcs = GitCli::new(tmp.path());

    assert!(vcs.is_repository());
    let head = vcs.head_revision().unwrap();
    assert_eq!(head.len(), 40);

    let files = vcs.list_tracked_files(&head).unwrap();
    let changes = classify_initial(&files, DEFAULT_EXTENSION);
    assert_eq!(
        changes,
        vec![FileChange::added("features/auth/user_login.feature")]
    );

    let content = vcs
        .file_content_at(&head, "features/auth/user_login.feature")
        .unwrap();
    assert_eq!(content, LOGIN);
}

#[test]
fn test_missing_file_at_revision_fails() {
    if !git_available() {
        return;
    }
    let tmp = setup_repo();
    let vcs = GitCli::new(tmp.path());
    let head = vcs.head_revision().unwrap();
    assert!(vcs.file_content_at(&head, "features/nope.feature").is_err());
}

#[test]
fn test_diff_detects_exact_rename_and_edits() {
    if !git_available() {
        return;
    }
    let tmp = setup_repo();
    let vcs = GitCli::new(tmp.path());
    let first = vcs.head_revision().unwrap();

    git(
        tmp.path(),
        &[
            "mv",
            "features/auth/user_login.feature",
            "features/login.feature",
        ],
    );
    write(
        tmp.path(),
        "features/signup.feature",
        "Feature: Signup\n\n  Scenario: New account\n    Given a visitor\n",
    );
    write(tmp.path(), "README.md", "# project\n\nMore docs.\n");
    git(tmp.path(), &["add", "-A"]);
    git(tmp.path(), &["commit", "-q", "-m", "reorganize"]);
    let second = vcs.head_revision().unwrap();

    let records = vcs.diff_name_status(&first, &second).unwrap();
    let changes = classify_diff(&records, DEFAULT_EXTENSION);
    assert_eq!(changes.len(), 2);
    assert!(changes.contains(&FileChange::renamed(
        "features/auth/user_login.feature",
        "features/login.feature",
        100
    )));
    assert!(changes.contains(&FileChange::added("features/signup.feature")));
    assert!(changes
        .iter()
        .any(|c| c.status == FileStatus::Renamed { similarity: 100 } && c.status.code() == "R100"));

    assert!(vcs.diff_name_status(&second, &second).unwrap().is_empty());
}

#[test]
fn test_working_tree_status() {
    if !git_available() {
        return;
    }
    let tmp = setup_repo();
    let vcs = GitCli::new(tmp.path());

    write(tmp.path(), "features/draft.feature", "Feature: Draft\n");
    write(
        tmp.path(),
        "features/auth/user_login.feature",
        &format!("{}\n  Scenario: Locked out\n    Given a locked account\n", LOGIN),
    );

    let status = vcs.working_tree_status().unwrap().only_spec_files(".feature");
    assert_eq!(status.modified, vec!["features/auth/user_login.feature"]);
    assert!(status.untracked.iter().any(|p| p.starts_with("features/")));
    assert!(status.staged.is_empty());
}

#[test]
fn test_runs_from_a_subdirectory() {
    if !git_available() {
        return;
    }
    let tmp = setup_repo();
    write(tmp.path(), "docs/notes.md", "notes\n");
    git(tmp.path(), &["add", "."]);
    git(tmp.path(), &["commit", "-q", "-m", "docs"]);

    let vcs = GitCli::discover(tmp.path().join("docs"));
    assert_eq!(vcs.repo_dir(), tmp.path().canonicalize().unwrap());
    assert!(vcs.is_repository());

    let head = vcs.head_revision().unwrap();
    let files = vcs.list_tracked_files(&head).unwrap();
    assert!(files.contains(&"docs/notes.md".to_string()));
    assert_eq!(
        classify_initial(&files, DEFAULT_EXTENSION),
        vec![FileChange::added("features/auth/user_login.feature")]
    );
    assert_eq!(
        vcs.file_content_at(&head, "features/auth/user_login.feature")
            .unwrap(),
        LOGIN
    );
}

#[test]
fn test_subdirectory_diff_ignores_relative_config() {
    if !git_available() {
        return;
    }
    let tmp = setup_repo();
    write(tmp.path(), "docs/notes.md", "notes\n");
    git(tmp.path(), &["add", "."]);
    git(tmp.path(), &["commit", "-q", "-m", "docs"]);
    git(tmp.path(), &["config", "diff.relative", "true"]);

    let vcs = GitCli::discover(tmp.path().join("docs"));
    let first = vcs.head_revision().unwrap();
    write(
        tmp.path(),
        "features/auth/user_login.feature",
        &format!("{}\n  Scenario: Locked out\n    Given a locked account\n", LOGIN),
    );
    git(tmp.path(), &["commit", "-q", "-am", "edit"]);
    let second = vcs.head_revision().unwrap();

    let records = vcs.diff_name_status(&first, &second).unwrap();
    assert_eq!(
        classify_diff(&records, DEFAULT_EXTENSION),
        vec![FileChange::modified("features/auth/user_login.feature")]
    );
}

#[test]
fn test_non_utf8_content_is_an_error() {
    if !git_available() {
        return;
    }
    let tmp = setup_repo();
    let full = tmp.path().join("features/latin1.feature");
    fs::write(&full, b"Feature: Caf\xe9\n").unwrap();
    git(tmp.path(), &["add", "."]);
    git(tmp.path(), &["commit", "-q", "-m", "latin1"]);

    let vcs = GitCli::new(tmp.path());
    let head = vcs.head_revision().unwrap();
    let err = vcs
        .file_content_at(&head, "features/latin1.feature")
        .unwrap_err();
    assert!(format!("{:#}", err).contains("non-UTF-8"));
}
