//! Delta assembly.
//!
//! Combines processed file changes, scenario matches, and resolved remote
//! identities into the [`SyncDelta`] submitted to the remote service.
//!
//! Per change:
//! - status and both paths are always present;
//! - the feature entry links to the old feature hash on renames and carries
//!   the remote suite id whenever the old hash resolves;
//! - scenario entries carry the matched previous hash and the remote case id
//!   it resolves to, and include their steps unless the file is an exact
//!   rename;
//! - old scenarios that nothing continues are appended as deletion markers.

use crate::matcher::match_scenarios;
use crate::models::{
    DeletionMarker, DeltaChange, DeltaFeature, DeltaScenario, IdentityMap, ProcessedChange,
    ScenarioEntry, SyncDelta,
};

/// Build the delta for one synchronization run.
pub fn build_delta(
    project_id: i64,
    prev_commit: Option<&str>,
    head_commit: &str,
    changes: &[ProcessedChange],
    identities: &IdentityMap,
) -> SyncDelta {
    SyncDelta {
        project_id,
        prev_commit: prev_commit.map(str::to_string),
        head_commit: head_commit.to_string(),
        changes: changes
            .iter()
            .map(|change| build_change(change, identities))
            .collect(),
    }
}

fn build_change(processed: &ProcessedChange, identities: &IdentityMap) -> DeltaChange {
    let status = processed.change.status;

    let feature = processed.feature.as_ref().map(|feature| DeltaFeature {
        hash: feature.hash.clone(),
        title: feature.title.clone(),
        description: feature.description.clone(),
        background: feature.background.clone(),
        prev_hash: if status.is_rename() {
            processed.old_feature_hash.clone()
        } else {
            None
        },
        suite_id: processed
            .old_feature_hash
            .as_deref()
            .and_then(|hash| identities.suite_id(hash)),
    });

    let outcome = match_scenarios(processed);
    let include_steps = !status.is_exact_rename();

    let mut scenarios: Vec<DeltaScenario> = outcome
        .matches
        .iter()
        .map(|m| {
            let scenario = &processed.scenarios[m.index];
            DeltaScenario::Present(ScenarioEntry {
                hash: scenario.hash.clone(),
                title: scenario.title.clone(),
                case_id: m.prev_hash.as_deref().and_then(|hash| identities.case_id(hash)),
                prev_hash: m.prev_hash.clone(),
                steps: include_steps.then(|| scenario.steps.clone()),
            })
        })
        .collect();
    scenarios.extend(
        outcome
            .deleted
            .into_iter()
            .map(|hash| DeltaScenario::Deleted(DeletionMarker::new(hash))),
    );

    DeltaChange {
        status: status.code(),
        old_path: processed.change.old_path.clone(),
        new_path: processed.change.new_path.clone(),
        feature,
        scenarios: if scenarios.is_empty() {
            None
        } else {
            Some(scenarios)
        },
    }
}

/// Old feature and scenario hashes across all changes, deduplicated in
/// first-seen order. These are the keys sent for identity resolution.
pub fn collect_old_hashes(changes: &[ProcessedChange]) -> (Vec<String>, Vec<String>) {
    let mut features: Vec<String> = Vec::new();
    let mut scenarios: Vec<String> = Vec::new();
    for change in changes {
        if let Some(hash) = &change.old_feature_hash {
            if !features.contains(hash) {
                features.push(hash.clone());
            }
        }
        for hash in change.old_scenario_hashes() {
            if !scenarios.iter().any(|h| h == hash) {
                scenarios.push(hash.to_string());
            }
        }
    }
    (features, scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::models::{CaseRef, FileChange, SuiteRef};

    const CART: &str = "\
Feature: Cart
  Shoppers keep items in a cart.

  Scenario: Add item
    Given an empty cart
    When the shopper adds a book
    Then the cart holds 1 item

  Scenario: Remove item
    Given a cart with a book
    When the shopper removes it
    Then the cart is empty
";

    fn processed(change: FileChange, old: Option<(&str, &str)>, new: Option<(&str, &str)>) -> ProcessedChange {
        let old = old.map(|(content, path)| extract(content, path).unwrap().unwrap());
        let new = new.map(|(content, path)| extract(content, path).unwrap().unwrap());
        ProcessedChange::new(change, old, new)
    }

    #[test]
    fn test_exact_rename_links_everything_and_omits_steps() {
        let change = processed(
            FileChange::renamed("features/cart.feature", "features/shop/cart.feature", 100),
            Some((CART, "features/cart.feature")),
            Some((CART, "features/shop/cart.feature")),
        );

        let mut identities = IdentityMap::default();
        identities.suites.insert(
            change.old_feature_hash.clone().unwrap(),
            SuiteRef { suite_id: 11 },
        );
        for (i, old) in change.old_scenarios.iter().enumerate() {
            identities
                .cases
                .insert(old.hash.clone(), CaseRef { case_id: 100 + i as i64 });
        }

        let delta = build_delta(5, Some("aaa"), "bbb", &[change.clone()], &identities);
        assert_eq!(delta.changes.len(), 1);
        let entry = &delta.changes[0];
        assert_eq!(entry.status, "R100");

        let feature = entry.feature.as_ref().unwrap();
        assert_eq!(feature.prev_hash, change.old_feature_hash);
        assert_ne!(Some(&feature.hash), feature.prev_hash.as_ref());
        assert_eq!(feature.suite_id, Some(11));

        let scenarios = entry.scenarios.as_ref().unwrap();
        assert_eq!(scenarios.len(), 2);
        for (i, scenario) in scenarios.iter().enumerate() {
            let scenario = scenario.as_present().unwrap();
            assert!(scenario.steps.is_none());
            assert_eq!(scenario.prev_hash.as_ref(), Some(&change.old_scenarios[i].hash));
            assert_eq!(scenario.case_id, Some(100 + i as i64));
        }
    }

    #[test]
    fn test_partial_rename_keeps_steps() {
        let edited = CART.replace("the cart holds 1 item", "the cart holds one item");
        let change = processed(
            FileChange::renamed("a.feature", "b.feature", 92),
            Some((CART, "a.feature")),
            Some((&edited, "b.feature")),
        );
        let delta = build_delta(1, Some("p"), "h", &[change], &IdentityMap::default());
        let scenarios = delta.changes[0].scenarios.as_ref().unwrap();
        assert!(scenarios
            .iter()
            .all(|s| s.as_present().unwrap().steps.is_some()));
        assert_eq!(delta.changes[0].status, "R092");
    }

    #[test]
    fn test_modified_file_has_suite_but_no_feature_prev_hash() {
        let edited = CART.replace("a book", "a lamp");
        let change = processed(
            FileChange::modified("cart.feature"),
            Some((CART, "cart.feature")),
            Some((&edited, "cart.feature")),
        );
        let mut identities = IdentityMap::default();
        identities.suites.insert(
            change.old_feature_hash.clone().unwrap(),
            SuiteRef { suite_id: 3 },
        );

        let delta = build_delta(1, Some("p"), "h", &[change], &identities);
        let feature = delta.changes[0].feature.as_ref().unwrap();
        assert_eq!(feature.prev_hash, None);
        assert_eq!(feature.suite_id, Some(3));
        assert_eq!(feature.description.as_deref(), Some("Shoppers keep items in a cart."));
    }

    #[test]
    fn test_removed_scenario_becomes_deletion_marker() {
        let trimmed = CART.split("  Scenario: Remove item").next().unwrap().to_string();
        let third = format!(
            "{}  Scenario: Checkout\n    Given a cart with a book\n    When the shopper pays\n",
            CART
        );
        let change = processed(
            FileChange::modified("cart.feature"),
            Some((&third, "cart.feature")),
            Some((&trimmed, "cart.feature")),
        );
        let delta = build_delta(1, Some("p"), "h", &[change.clone()], &IdentityMap::default());
        let scenarios = delta.changes[0].scenarios.as_ref().unwrap();

        let deleted: Vec<&DeltaScenario> = scenarios.iter().filter(|s| s.is_deleted()).collect();
        assert_eq!(deleted.len(), 2);
        assert_eq!(
            deleted[0],
            &DeltaScenario::Deleted(DeletionMarker::new(change.old_scenarios[1].hash.clone()))
        );
    }

    #[test]
    fn test_deleted_file_has_no_feature_and_only_markers() {
        let change = processed(
            FileChange::deleted("cart.feature"),
            Some((CART, "cart.feature")),
            None,
        );
        let delta = build_delta(1, Some("p"), "h", &[change], &IdentityMap::default());
        let entry = &delta.changes[0];
        assert_eq!(entry.status, "D");
        assert!(entry.feature.is_none());
        assert_eq!(entry.new_path, None);
        let scenarios = entry.scenarios.as_ref().unwrap();
        assert_eq!(scenarios.len(), 2);
        assert!(scenarios.iter().all(DeltaScenario::is_deleted));
    }

    #[test]
    fn test_added_file_wire_shape() {
        let change = processed(FileChange::added("cart.feature"), None, Some((CART, "cart.feature")));
        let delta = build_delta(9, None, "head", &[change], &IdentityMap::default());
        let json = serde_json::to_value(&delta).unwrap();

        assert_eq!(json["projectId"], 9);
        assert!(json["prevCommit"].is_null());
        assert_eq!(json["headCommit"], "head");
        let change = &json["changes"][0];
        assert_eq!(change["status"], "A");
        assert!(change["oldPath"].is_null());
        assert_eq!(change["newPath"], "cart.feature");
        assert!(change["feature"].get("prevHash").is_none());
        assert!(change["feature"].get("background").is_none());
        let scenario = &change["scenarios"][0];
        assert!(scenario.get("prevHash").is_none());
        assert_eq!(scenario["steps"][0]["keyword"], "Given");
        assert_eq!(scenario["steps"][0]["text"], "an empty cart");
    }

    #[test]
    fn test_collect_old_hashes_dedups() {
        let a = processed(
            FileChange::modified("cart.feature"),
            Some((CART, "cart.feature")),
            Some((CART, "cart.feature")),
        );
        let b = a.clone();
        let added = processed(FileChange::added("x.feature"), None, Some((CART, "x.feature")));

        let (features, scenarios) = collect_old_hashes(&[a.clone(), b, added]);
        assert_eq!(features, vec![a.old_feature_hash.clone().unwrap()]);
        assert_eq!(scenarios.len(), 2);
    }
}
