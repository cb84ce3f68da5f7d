//! Read-only access to the Git repository holding the feature files.
//!
//! The [`Vcs`] trait is the whole surface the sync needs from version
//! control. [`GitCli`] implements it by running the `git` binary; tests use
//! in-memory implementations.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Version-control primitives used by a sync run. Nothing here writes to
/// the repository.
pub trait Vcs {
    fn is_repository(&self) -> bool;

    fn head_revision(&self) -> Result<String>;

    /// Raw `--name-status` records between two revisions, with rename
    /// detection enabled.
    fn diff_name_status(&self, from: &str, to: &str) -> Result<Vec<String>>;

    fn list_tracked_files(&self, revision: &str) -> Result<Vec<String>>;

    /// Content of `path` at `revision`. Fails when the path does not exist
    /// there.
    fn file_content_at(&self, revision: &str, path: &str) -> Result<String>;

    fn working_tree_status(&self) -> Result<WorkingTreeStatus>;
}

/// Uncommitted paths in the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub staged: Vec<String>,
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
}

impl WorkingTreeStatus {
    /// Keep only paths ending with `extension`.
    pub fn only_spec_files(&self, extension: &str) -> Self {
        let keep = |paths: &[String]| -> Vec<String> {
            paths
                .iter()
                .filter(|p| p.ends_with(extension))
                .cloned()
                .collect()
        };
        Self {
            staged: keep(&self.staged),
            modified: keep(&self.modified),
            untracked: keep(&self.untracked),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.modified.is_empty() && self.untracked.is_empty()
    }
}

/// [`Vcs`] backed by the `git` command-line tool.
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    /// Open the work tree containing `dir`, running every command from its
    /// top level so paths are always repository-relative. Outside a
    /// repository `dir` is kept as-is and [`Vcs::is_repository`] reports
    /// false.
    pub fn discover(dir: impl Into<PathBuf>) -> Self {
        let start = Self::new(dir);
        match start.git(&["rev-parse", "--show-toplevel"]) {
            Ok(top) if !top.trim().is_empty() => Self::new(top.trim()),
            _ => start,
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(["-c", "core.quotepath=off"])
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .with_context(|| format!("Failed to execute 'git {}'. Is git installed?", args[0]))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }

        String::from_utf8(output.stdout)
            .with_context(|| format!("git {} produced non-UTF-8 output", args.join(" ")))
    }
}

impl Vcs for GitCli {
    fn is_repository(&self) -> bool {
        self.git(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    fn head_revision(&self) -> Result<String> {
        let sha = self.git(&["rev-parse", "HEAD"])?;
        Ok(sha.trim().to_string())
    }

    fn diff_name_status(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let out = self.git(&["diff", "--name-status", "-M", from, to])?;
        Ok(non_empty_lines(&out))
    }

    fn list_tracked_files(&self, revision: &str) -> Result<Vec<String>> {
        let out = self.git(&["ls-tree", "-r", "--full-tree", "--name-only", revision])?;
        Ok(non_empty_lines(&out))
    }

    fn file_content_at(&self, revision: &str, path: &str) -> Result<String> {
        self.git(&["show", &format!("{}:{}", revision, path)])
    }

    fn working_tree_status(&self) -> Result<WorkingTreeStatus> {
        let out = self.git(&["status", "--porcelain"])?;
        Ok(parse_porcelain(&out))
    }
}

fn non_empty_lines(out: &str) -> Vec<String> {
    out.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `git status --porcelain` (v1) output.
///
/// A path can be both staged and modified (`MM`). For renames the new path
/// is reported.
pub fn parse_porcelain(out: &str) -> WorkingTreeStatus {
    let mut status = WorkingTreeStatus::default();
    for line in out.lines() {
        if line.len() < 4 {
            continue;
        }
        let (code, rest) = line.split_at(2);
        let path = rest.trim_start();
        let path = match path.split_once(" -> ") {
            Some((_, new)) => new,
            None => path,
        }
        .to_string();

        let mut flags = code.chars();
        let index = flags.next().unwrap_or(' ');
        let worktree = flags.next().unwrap_or(' ');

        if index == '?' && worktree == '?' {
            status.untracked.push(path);
            continue;
        }
        if index != ' ' {
            status.staged.push(path.clone());
        }
        if worktree != ' ' {
            status.modified.push(path);
        }
    }
    status
}
