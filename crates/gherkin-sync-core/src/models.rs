//! Core data models used throughout gherkin-sync.
//!
//! Two families of types live here: the in-memory records produced while
//! reconciling a revision range ([`SpecDocument`], [`FileChange`],
//! [`ProcessedChange`], [`IdentityMap`]) and the wire payload submitted to
//! the remote service ([`SyncDelta`] and its parts).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single Gherkin step, e.g. `Given` / `the user is logged in`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step keyword without trailing whitespace (`Given`, `When`, `*`, ...).
    pub keyword: String,
    pub text: String,
}

impl Step {
    pub fn new(keyword: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
        }
    }

    /// The step as it reads in the file: `"<keyword> <text>"`.
    pub fn line(&self) -> String {
        format!("{} {}", self.keyword, self.text)
    }
}

/// Render a step list as hashable text, one step per line.
pub fn steps_text(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&step.line());
        out.push('\n');
    }
    out
}

/// One scenario of a feature file, with its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioRecord {
    pub title: String,
    pub steps: Vec<Step>,
    /// Hash over the step text and the file path.
    pub hash: String,
}

/// Normalized parse of one feature file.
///
/// Built fresh from a `(content, path)` pair and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDocument {
    pub title: String,
    /// Free text between the `Feature:` line and the first block.
    pub description: Option<String>,
    /// `None` when the file has no `Background:` block.
    pub background: Option<Vec<Step>>,
    /// Scenarios in source order.
    pub scenarios: Vec<ScenarioRecord>,
    pub feature_hash: String,
}

/// Status of a file in a revision-range diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    /// Rename with the similarity score reported by the rename detector
    /// (100 = identical content).
    Renamed { similarity: u8 },
}

impl FileStatus {
    /// Parse a status token such as `A`, `M`, `D`, or `R097`.
    ///
    /// Returns `None` for letters this tool does not track (copies, type
    /// changes, unmerged entries) and for malformed scores.
    pub fn parse(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let letter = chars.next()?;
        let digits = chars.as_str();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        match letter {
            'A' if digits.is_empty() => Some(FileStatus::Added),
            'M' if digits.is_empty() => Some(FileStatus::Modified),
            'D' if digits.is_empty() => Some(FileStatus::Deleted),
            'R' => {
                // git always attaches a score to renames; a bare `R` is
                // treated as an exact rename.
                let similarity = if digits.is_empty() {
                    100
                } else {
                    digits.parse::<u8>().ok().filter(|s| *s <= 100)?
                };
                Some(FileStatus::Renamed { similarity })
            }
            _ => None,
        }
    }

    /// Wire status code: `A`, `M`, `D`, or `R` plus the three-digit score
    /// exactly as git prints it (`R100`, `R097`).
    pub fn code(&self) -> String {
        self.to_string()
    }

    pub fn is_addition(&self) -> bool {
        matches!(self, FileStatus::Added)
    }

    pub fn is_rename(&self) -> bool {
        matches!(self, FileStatus::Renamed { .. })
    }

    /// A rename whose content is byte-identical to the old file.
    pub fn is_exact_rename(&self) -> bool {
        matches!(self, FileStatus::Renamed { similarity: 100 })
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "A"),
            FileStatus::Modified => write!(f, "M"),
            FileStatus::Deleted => write!(f, "D"),
            FileStatus::Renamed { similarity } => write!(f, "R{:03}", similarity),
        }
    }
}

/// One spec-file entry of a revision-range diff.
///
/// `Added` carries only `new_path`, `Deleted` only `old_path`, `Renamed`
/// both. `Modified` carries only `new_path` (the path is unchanged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub status: FileStatus,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
}

impl FileChange {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Added,
            old_path: None,
            new_path: Some(path.into()),
        }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Modified,
            old_path: None,
            new_path: Some(path.into()),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Deleted,
            old_path: Some(path.into()),
            new_path: None,
        }
    }

    pub fn renamed(old: impl Into<String>, new: impl Into<String>, similarity: u8) -> Self {
        Self {
            status: FileStatus::Renamed { similarity },
            old_path: Some(old.into()),
            new_path: Some(new.into()),
        }
    }

    /// Path of the file at the prior revision, if it existed there.
    ///
    /// A modification keeps its path, so the new path doubles as the old one.
    pub fn prior_path(&self) -> Option<&str> {
        match self.status {
            FileStatus::Added => None,
            _ => self.old_path.as_deref().or(self.new_path.as_deref()),
        }
    }

    /// Path for log lines: the new path when present, else the old one.
    pub fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("<unknown>")
    }
}

/// Fields of the new revision's feature that travel in the delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSummary {
    pub title: String,
    pub description: Option<String>,
    pub background: Option<Vec<Step>>,
    pub hash: String,
}

/// A [`FileChange`] enriched with the documents extracted at both revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedChange {
    pub change: FileChange,
    pub old_feature_hash: Option<String>,
    /// Full old records; titles are needed for title-based matching.
    pub old_scenarios: Vec<ScenarioRecord>,
    pub feature: Option<FeatureSummary>,
    pub scenarios: Vec<ScenarioRecord>,
}

impl ProcessedChange {
    /// Combine a change with the documents extracted at the prior and head
    /// revisions.
    pub fn new(change: FileChange, old: Option<SpecDocument>, new: Option<SpecDocument>) -> Self {
        let (old_feature_hash, old_scenarios) = match old {
            Some(doc) => (Some(doc.feature_hash), doc.scenarios),
            None => (None, Vec::new()),
        };
        let (feature, scenarios) = match new {
            Some(doc) => (
                Some(FeatureSummary {
                    title: doc.title,
                    description: doc.description,
                    background: doc.background,
                    hash: doc.feature_hash,
                }),
                doc.scenarios,
            ),
            None => (None, Vec::new()),
        };
        Self {
            change,
            old_feature_hash,
            old_scenarios,
            feature,
            scenarios,
        }
    }

    pub fn old_scenario_hashes(&self) -> Vec<&str> {
        self.old_scenarios.iter().map(|s| s.hash.as_str()).collect()
    }
}

/// Remote suite reference returned by identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRef {
    pub suite_id: i64,
}

/// Remote case reference returned by identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRef {
    pub case_id: i64,
}

/// Old content hashes mapped to the remote records that carry them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMap {
    #[serde(default)]
    pub suites: BTreeMap<String, SuiteRef>,
    #[serde(default)]
    pub cases: BTreeMap<String, CaseRef>,
}

impl IdentityMap {
    pub fn suite_id(&self, feature_hash: &str) -> Option<i64> {
        self.suites.get(feature_hash).map(|s| s.suite_id)
    }

    pub fn case_id(&self, scenario_hash: &str) -> Option<i64> {
        self.cases.get(scenario_hash).map(|c| c.case_id)
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty() && self.cases.is_empty()
    }
}

// ============ Wire payload ============

/// The full delta submitted to the remote service in one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDelta {
    pub project_id: i64,
    pub prev_commit: Option<String>,
    pub head_commit: String,
    pub changes: Vec<DeltaChange>,
}

/// One file's entry in a [`SyncDelta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaChange {
    /// `A`, `M`, `D`, or `R<NNN>`.
    pub status: String,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<DeltaFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<DeltaScenario>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaFeature {
    pub hash: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<i64>,
}

/// A scenario entry: either a present scenario or a deletion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeltaScenario {
    Present(ScenarioEntry),
    Deleted(DeletionMarker),
}

impl DeltaScenario {
    pub fn as_present(&self) -> Option<&ScenarioEntry> {
        match self {
            DeltaScenario::Present(entry) => Some(entry),
            DeltaScenario::Deleted(_) => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, DeltaScenario::Deleted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioEntry {
    pub hash: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<i64>,
    /// Omitted only when the file is an exact rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionMarker {
    pub prev_hash: String,
    pub deleted: bool,
}

impl DeletionMarker {
    pub fn new(prev_hash: impl Into<String>) -> Self {
        Self {
            prev_hash: prev_hash.into(),
            deleted: true,
        }
    }
}
