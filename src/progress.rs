//! Sync progress reporting.
//!
//! The orchestrator reports every phase transition and every processed file
//! through a [`SyncProgressReporter`]. Progress goes to **stderr** so stdout
//! stays parseable (the run summary and `--dry-run` JSON go to stdout).

use std::io::Write;

/// Phases of a sync run.
///
/// ```text
/// Idle → FetchingState → ComparingRevisions → NoOp
///                                   └→ ProcessingChanges → ResolvingIdentities
///                                      → BuildingPayload → Submitting → ReportingResults
/// ```
///
/// `Failed` is reachable from every phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncPhase {
    Idle,
    FetchingState,
    ComparingRevisions,
    NoOp,
    ProcessingChanges,
    ResolvingIdentities,
    BuildingPayload,
    Submitting,
    ReportingResults,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::FetchingState => "fetching-state",
            SyncPhase::ComparingRevisions => "comparing-revisions",
            SyncPhase::NoOp => "no-op",
            SyncPhase::ProcessingChanges => "processing-changes",
            SyncPhase::ResolvingIdentities => "resolving-identities",
            SyncPhase::BuildingPayload => "building-payload",
            SyncPhase::Submitting => "submitting",
            SyncPhase::ReportingResults => "reporting-results",
            SyncPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncPhase::NoOp | SyncPhase::ReportingResults | SyncPhase::Failed
        )
    }

    fn label(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "starting",
            SyncPhase::FetchingState => "fetching last sync state...",
            SyncPhase::ComparingRevisions => "comparing revisions...",
            SyncPhase::NoOp => "up to date",
            SyncPhase::ProcessingChanges => "processing changed files...",
            SyncPhase::ResolvingIdentities => "resolving existing suites and cases...",
            SyncPhase::BuildingPayload => "building delta...",
            SyncPhase::Submitting => "submitting delta...",
            SyncPhase::ReportingResults => "done",
            SyncPhase::Failed => "failed",
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug)]
pub enum SyncProgressEvent {
    /// The run entered a new phase.
    Phase(SyncPhase),
    /// File `n` of `total` is being processed.
    Processing { path: String, n: u64, total: u64 },
    /// A file was left out of the delta.
    Skipped { path: String, reason: String },
}

/// Receives progress events from the orchestrator.
pub trait SyncProgressReporter: Send + Sync {
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "sync  processing  3 / 12  features/login.feature".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Phase(phase) => format!("sync  {}\n", phase.label()),
            SyncProgressEvent::Processing { path, n, total } => format!(
                "sync  processing  {} / {}  {}\n",
                format_number(*n),
                format_number(*total),
                path
            ),
            SyncProgressEvent::Skipped { path, reason } => {
                format!("sync  skipped  {}: {}\n", path, reason)
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Phase(phase) => serde_json::json!({
                "event": "phase",
                "phase": phase.as_str(),
            }),
            SyncProgressEvent::Processing { path, n, total } => serde_json::json!({
                "event": "progress",
                "phase": SyncPhase::ProcessingChanges.as_str(),
                "path": path,
                "n": n,
                "total": total,
            }),
            SyncProgressEvent::Skipped { path, reason } => serde_json::json!({
                "event": "skipped",
                "path": path,
                "reason": reason,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
