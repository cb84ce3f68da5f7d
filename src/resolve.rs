//! Identity resolution: one batched lookup of every old hash in the run.

use anyhow::Result;

use gherkin_sync_core::models::IdentityMap;

use crate::api::{ResolveRequest, SyncService};

/// Resolve old feature and scenario hashes to remote suite and case ids.
///
/// With nothing to resolve (an initial sync, or only additions) no request
/// is made and the map is empty. Any service error is returned as-is; the
/// caller treats it as fatal.
pub async fn resolve_identities(
    service: &dyn SyncService,
    project_id: i64,
    features: &[String],
    scenarios: &[String],
) -> Result<IdentityMap> {
    if features.is_empty() && scenarios.is_empty() {
        return Ok(IdentityMap::default());
    }

    let request = ResolveRequest {
        project_id,
        features: features.to_vec(),
        scenarios: scenarios.to_vec(),
    };
    service.resolve_identities(&request).await
}
