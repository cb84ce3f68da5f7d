//! Scenario matching between the old and new revision of one file.
//!
//! For every new scenario, in source order, the first applicable rule wins:
//!
//! 1. **Hash**: the scenario's hash is among the old hashes (steps and path
//!    unchanged).
//! 2. **Title**: an old scenario carries the identical title.
//! 3. **Position**: old and new scenario counts are equal; map by index.
//! 4. Otherwise the scenario is new.
//!
//! The positional rule misfires when several scenarios are reordered and
//! renamed in one commit while the count stays equal. It is kept as the
//! last resort on purpose and must not be made smarter without a product
//! decision.
//!
//! Old hashes claimed by no new scenario become deletions, unless the file
//! itself was just added.

use std::collections::HashSet;

use crate::models::{ProcessedChange, ScenarioRecord};

/// Which rule connected a new scenario to an old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Hash,
    Title,
    Position,
}

/// The matching decision for one new scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioMatch {
    /// Index into the new scenario list.
    pub index: usize,
    /// Hash of the old scenario this one continues, if any.
    pub prev_hash: Option<String>,
    pub kind: Option<MatchKind>,
}

/// Matching results for a whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// One entry per new scenario, in source order.
    pub matches: Vec<ScenarioMatch>,
    /// Old hashes that no new scenario continues.
    pub deleted: Vec<String>,
}

/// Match the new scenarios of `change` against its old scenarios.
pub fn match_scenarios(change: &ProcessedChange) -> MatchOutcome {
    let matches = match_records(&change.old_scenarios, &change.scenarios);

    let deleted = if change.change.status.is_addition() {
        Vec::new()
    } else {
        unclaimed_hashes(&change.old_scenarios, &change.scenarios, &matches)
    };

    MatchOutcome { matches, deleted }
}

/// Apply the matching rules to every scenario in `new`.
pub fn match_records(old: &[ScenarioRecord], new: &[ScenarioRecord]) -> Vec<ScenarioMatch> {
    let old_hashes: HashSet<&str> = old.iter().map(|s| s.hash.as_str()).collect();
    let same_count = old.len() == new.len();

    new.iter()
        .enumerate()
        .map(|(index, scenario)| {
            let (prev_hash, kind) = if old_hashes.contains(scenario.hash.as_str()) {
                (Some(scenario.hash.clone()), Some(MatchKind::Hash))
            } else if let Some(by_title) = old.iter().find(|o| o.title == scenario.title) {
                (Some(by_title.hash.clone()), Some(MatchKind::Title))
            } else if same_count {
                (Some(old[index].hash.clone()), Some(MatchKind::Position))
            } else {
                (None, None)
            };
            ScenarioMatch {
                index,
                prev_hash,
                kind,
            }
        })
        .collect()
}

fn unclaimed_hashes(
    old: &[ScenarioRecord],
    new: &[ScenarioRecord],
    matches: &[ScenarioMatch],
) -> Vec<String> {
    let claimed: HashSet<&str> = new
        .iter()
        .map(|s| s.hash.as_str())
        .chain(matches.iter().filter_map(|m| m.prev_hash.as_deref()))
        .collect();

    let mut seen = HashSet::new();
    old.iter()
        .map(|s| s.hash.as_str())
        .filter(|hash| !claimed.contains(hash) && seen.insert(*hash))
        .map(str::to_string)
        .collect()
}
