//! Change processing: load both revisions of a changed file and extract them.
//!
//! Failures are scoped to the file. The orchestrator logs them and leaves
//! the file out of the delta; they never abort the run.

use gherkin_sync_core::extract::{extract, ExtractError};
use gherkin_sync_core::models::{FileChange, ProcessedChange, SpecDocument};

use crate::git::Vcs;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("could not read {path} at {revision}: {message}")]
    Fetch {
        path: String,
        revision: String,
        message: String,
    },
    #[error(transparent)]
    Parse(#[from] ExtractError),
}

/// Extract the old and new documents for one change.
///
/// The old side is read at `prior` unless the change is an addition or
/// there is no prior revision. The new side is read at `head` whenever the
/// change has a new path.
pub fn process_change(
    vcs: &dyn Vcs,
    change: &FileChange,
    prior: Option<&str>,
    head: &str,
) -> Result<ProcessedChange, ProcessingError> {
    let old = match (prior, change.prior_path()) {
        (Some(revision), Some(path)) => load_document(vcs, revision, path)?,
        _ => None,
    };

    let new = match change.new_path.as_deref() {
        Some(path) => load_document(vcs, head, path)?,
        None => None,
    };

    Ok(ProcessedChange::new(change.clone(), old, new))
}

fn load_document(
    vcs: &dyn Vcs,
    revision: &str,
    path: &str,
) -> Result<Option<SpecDocument>, ProcessingError> {
    let content = vcs
        .file_content_at(revision, path)
        .map_err(|e| ProcessingError::Fetch {
            path: path.to_string(),
            revision: revision.to_string(),
            message: format!("{:#}", e),
        })?;
    Ok(extract(&content, path)?)
}
