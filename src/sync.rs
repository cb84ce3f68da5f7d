//! Sync orchestration.
//!
//! Drives one run through its phases (see [`SyncPhase`]) against a [`Vcs`]
//! and a [`SyncService`]:
//!
//! 1. Fetch the last synced revision from the service.
//! 2. Compare it with HEAD; stop when nothing changed.
//! 3. Classify and process every changed spec file, one at a time.
//! 4. Resolve all old hashes in a single request.
//! 5. Build the delta and submit it in a single request.
//!
//! Per-file failures are logged and the file is left out. Everything else
//! aborts the run; nothing is retried and nothing is submitted partially.

use anyhow::{bail, Result};
use std::fmt::Write;

use gherkin_sync_core::classify::{classify_diff, classify_initial, parse_diff_record};
use gherkin_sync_core::models::{FileChange, ProcessedChange, SyncDelta};
use gherkin_sync_core::payload::{build_delta, collect_old_hashes};

use crate::api::{HttpSyncService, SyncOutcome, SyncService};
use crate::config::Settings;
use crate::git::{GitCli, Vcs, WorkingTreeStatus};
use crate::process::process_change;
use crate::progress::{ProgressMode, SyncPhase, SyncProgressEvent, SyncProgressReporter};
use crate::resolve::resolve_identities;

/// Orchestrator inputs that do not come from the collaborators.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub project_id: i64,
    pub extension: String,
    pub warn_uncommitted: bool,
    /// Build the delta but do not submit it.
    pub dry_run: bool,
    /// Log the full delta before submission.
    pub debug: bool,
}

impl From<&Settings> for SyncOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            project_id: settings.project_id,
            extension: settings.extension.clone(),
            warn_uncommitted: settings.warn_uncommitted,
            dry_run: settings.dry_run,
            debug: settings.debug,
        }
    }
}

/// A file left out of the delta, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// The delta for a revision range plus the files that could not be processed.
#[derive(Debug, Clone)]
pub struct Plan {
    pub delta: SyncDelta,
    pub skipped: Vec<SkippedFile>,
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum SyncReport {
    /// Nothing to do: HEAD is already synced or no spec file changed.
    UpToDate {
        prev: Option<String>,
        head: String,
    },
    /// The delta was built but not submitted.
    DryRun(Plan),
    Submitted { plan: Plan, outcome: SyncOutcome },
}

pub struct Orchestrator<'a> {
    vcs: &'a dyn Vcs,
    service: &'a dyn SyncService,
    progress: &'a dyn SyncProgressReporter,
    options: SyncOptions,
    phase: SyncPhase,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        vcs: &'a dyn Vcs,
        service: &'a dyn SyncService,
        progress: &'a dyn SyncProgressReporter,
        options: SyncOptions,
    ) -> Self {
        Self {
            vcs,
            service,
            progress,
            options,
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    fn enter(&mut self, phase: SyncPhase) {
        tracing::debug!(from = self.phase.as_str(), to = phase.as_str(), "sync phase");
        self.phase = phase;
        self.progress.report(SyncProgressEvent::Phase(phase));
    }

    /// Run to a terminal phase. Any error leaves the orchestrator in
    /// [`SyncPhase::Failed`].
    pub async fn run(&mut self) -> Result<SyncReport> {
        let result = self.run_phases().await;
        if result.is_err() {
            self.enter(SyncPhase::Failed);
        }
        result
    }

    async fn run_phases(&mut self) -> Result<SyncReport> {
        if !self.vcs.is_repository() {
            bail!("not inside a git repository");
        }
        if self.options.warn_uncommitted {
            self.warn_uncommitted();
        }

        self.enter(SyncPhase::FetchingState);
        let state = self.service.fetch_sync_state(self.options.project_id).await?;
        let prev = state.last_synced_commit;

        self.enter(SyncPhase::ComparingRevisions);
        let head = self.vcs.head_revision()?;
        if prev.as_deref() == Some(head.as_str()) {
            self.enter(SyncPhase::NoOp);
            return Ok(SyncReport::UpToDate { prev, head });
        }
        let changes = self.classify(prev.as_deref(), &head)?;
        if changes.is_empty() {
            self.enter(SyncPhase::NoOp);
            return Ok(SyncReport::UpToDate { prev, head });
        }

        let plan = self.plan_changes(prev.as_deref(), &head, &changes).await?;

        if self.options.dry_run {
            self.enter(SyncPhase::ReportingResults);
            return Ok(SyncReport::DryRun(plan));
        }

        self.enter(SyncPhase::Submitting);
        let outcome = self.service.submit_delta(&plan.delta).await?;

        self.enter(SyncPhase::ReportingResults);
        Ok(SyncReport::Submitted { plan, outcome })
    }

    /// Spec-file changes between `prev` and `head`; every tracked spec file
    /// when there is no prior sync.
    pub fn classify(&self, prev: Option<&str>, head: &str) -> Result<Vec<FileChange>> {
        let changes = match prev {
            Some(prev) => {
                let records = self.vcs.diff_name_status(prev, head)?;
                for record in records.iter().filter(|r| parse_diff_record(r).is_none()) {
                    tracing::debug!(record = %record, "dropping unrecognized diff record");
                }
                classify_diff(&records, &self.options.extension)
            }
            None => {
                let files = self.vcs.list_tracked_files(head)?;
                classify_initial(&files, &self.options.extension)
            }
        };
        tracing::debug!(count = changes.len(), "classified spec file changes");
        Ok(changes)
    }

    /// Compute the delta for `prev..head` without submitting it.
    pub async fn plan(&mut self, prev: Option<&str>, head: &str) -> Result<Plan> {
        let changes = self.classify(prev, head)?;
        self.plan_changes(prev, head, &changes).await
    }

    async fn plan_changes(
        &mut self,
        prev: Option<&str>,
        head: &str,
        changes: &[FileChange],
    ) -> Result<Plan> {
        self.enter(SyncPhase::ProcessingChanges);
        let (processed, skipped) = self.process_all(prev, head, changes);

        self.enter(SyncPhase::ResolvingIdentities);
        let (features, scenarios) = collect_old_hashes(&processed);
        let identities =
            resolve_identities(self.service, self.options.project_id, &features, &scenarios)
                .await?;

        self.enter(SyncPhase::BuildingPayload);
        let delta = build_delta(self.options.project_id, prev, head, &processed, &identities);
        if self.options.debug {
            match serde_json::to_string_pretty(&delta) {
                Ok(json) => tracing::debug!("delta:\n{}", json),
                Err(e) => tracing::debug!(error = %e, "could not render delta"),
            }
        }

        Ok(Plan { delta, skipped })
    }

    fn process_all(
        &self,
        prev: Option<&str>,
        head: &str,
        changes: &[FileChange],
    ) -> (Vec<ProcessedChange>, Vec<SkippedFile>) {
        let total = changes.len() as u64;
        let mut processed = Vec::with_capacity(changes.len());
        let mut skipped = Vec::new();

        for (i, change) in changes.iter().enumerate() {
            let path = change.display_path().to_string();
            self.progress.report(SyncProgressEvent::Processing {
                path: path.clone(),
                n: i as u64 + 1,
                total,
            });

            match process_change(self.vcs, change, prev, head) {
                Ok(p) => processed.push(p),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "skipping file");
                    let reason = e.to_string();
                    self.progress.report(SyncProgressEvent::Skipped {
                        path: path.clone(),
                        reason: reason.clone(),
                    });
                    skipped.push(SkippedFile { path, reason });
                }
            }
        }

        (processed, skipped)
    }

    fn warn_uncommitted(&self) {
        match self.vcs.working_tree_status() {
            Ok(status) => {
                let spec = status.only_spec_files(&self.options.extension);
                for path in uncommitted_paths(&spec) {
                    tracing::warn!(path = %path, "uncommitted spec file will not be synced");
                }
            }
            Err(e) => tracing::debug!(error = %e, "could not read working tree status"),
        }
    }
}

fn uncommitted_paths(status: &WorkingTreeStatus) -> Vec<&str> {
    let mut paths: Vec<&str> = status
        .staged
        .iter()
        .chain(&status.modified)
        .chain(&status.untracked)
        .map(String::as_str)
        .collect();
    paths.sort_unstable();
    paths.dedup();
    paths
}

/// Entry point for `gsync push`.
pub async fn run_sync(settings: &Settings, progress: ProgressMode) -> Result<()> {
    let repo_dir = std::env::current_dir()?;
    let vcs = GitCli::discover(repo_dir);
    let service = HttpSyncService::new(&settings.api_url, &settings.token, settings.timeout)?;
    let reporter = progress.reporter();

    let mut orchestrator =
        Orchestrator::new(&vcs, &service, reporter.as_ref(), SyncOptions::from(settings));
    let report = orchestrator.run().await?;
    print!("{}", render_report(settings.project_id, &report)?);
    if let SyncReport::DryRun(plan) = &report {
        for file in &plan.skipped {
            eprintln!("skipped {}: {}", file.path, file.reason);
        }
    }
    Ok(())
}

/// Entry point for `gsync status`.
pub fn run_status(extension: &str) -> Result<()> {
    let vcs = GitCli::discover(std::env::current_dir()?);
    if !vcs.is_repository() {
        bail!("not inside a git repository");
    }
    let head = vcs.head_revision().unwrap_or_else(|_| "(no commits)".to_string());
    let status = vcs.working_tree_status()?.only_spec_files(extension);

    println!("HEAD: {}", head);
    if status.is_clean() {
        println!("All spec files are committed.");
        return Ok(());
    }
    print_paths("staged", &status.staged);
    print_paths("modified", &status.modified);
    print_paths("untracked", &status.untracked);
    println!("Only committed changes are synced.");
    Ok(())
}

fn print_paths(label: &str, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    println!("  {}:", label);
    for path in paths {
        println!("    {}", path);
    }
}

/// Render the run summary printed on stdout.
///
/// A dry run renders only the delta JSON so the output can be piped.
pub fn render_report(project_id: i64, report: &SyncReport) -> Result<String> {
    let mut out = String::new();
    match report {
        SyncReport::UpToDate { head, .. } => {
            writeln!(out, "sync project {}", project_id)?;
            writeln!(out, "  head: {}", head)?;
            writeln!(out, "  no changes needed")?;
            writeln!(out, "ok")?;
        }
        SyncReport::DryRun(plan) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&plan.delta)?)?;
        }
        SyncReport::Submitted { plan, outcome } => {
            writeln!(out, "sync project {}", project_id)?;
            writeln!(
                out,
                "  range: {}..{}",
                plan.delta.prev_commit.as_deref().unwrap_or("(initial)"),
                plan.delta.head_commit
            )?;
            writeln!(out, "  files: {}", plan.delta.changes.len())?;
            if outcome.total() == 0 {
                writeln!(out, "  no changes needed")?;
            } else {
                writeln!(
                    out,
                    "  suites: {} created, {} renamed, {} deleted",
                    outcome.created_suites, outcome.renamed_suites, outcome.deleted_suites
                )?;
                writeln!(
                    out,
                    "  cases: {} created, {} renamed, {} updated, {} deleted",
                    outcome.created_cases,
                    outcome.renamed_cases,
                    outcome.updated_cases,
                    outcome.deleted_cases
                )?;
            }
            for warning in &outcome.warnings {
                writeln!(out, "  warning: {}", warning)?;
            }
            for file in &plan.skipped {
                writeln!(out, "  skipped {}: {}", file.path, file.reason)?;
            }
            writeln!(out, "ok")?;
        }
    }
    Ok(out)
}
