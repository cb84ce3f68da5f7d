//! Client for the remote test-management service.
//!
//! Three calls make up the contract:
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | fetch sync state | `GET {base}/projects/{id}/sync-state` | `{ lastSyncedCommit }` |
//! | resolve identities | `POST {base}/projects/{id}/sync/resolve` | `{ results: { suites, cases } }` |
//! | submit delta | `POST {base}/projects/{id}/sync` | outcome counts + warnings |
//!
//! Every request carries `Authorization: Bearer <token>`. Any non-2xx
//! response is a fatal error that surfaces the service's own message. No
//! call is retried.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use gherkin_sync_core::models::{IdentityMap, SyncDelta};

/// The remote service as seen by the orchestrator.
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Revision recorded by the last successful sync, if any.
    async fn fetch_sync_state(&self, project_id: i64) -> Result<SyncState>;

    /// Map old content hashes to the remote records carrying them.
    async fn resolve_identities(&self, request: &ResolveRequest) -> Result<IdentityMap>;

    /// Apply a delta. The service applies it atomically.
    async fn submit_delta(&self, delta: &SyncDelta) -> Result<SyncOutcome>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(default)]
    pub last_synced_commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub project_id: i64,
    pub features: Vec<String>,
    pub scenarios: Vec<String>,
}

/// Envelope around the identity map in the resolve response.
#[derive(Debug, Default, Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    results: IdentityMap,
}

/// What the service did with a submitted delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOutcome {
    pub created_suites: u64,
    pub created_cases: u64,
    pub renamed_suites: u64,
    pub renamed_cases: u64,
    pub updated_cases: u64,
    pub deleted_suites: u64,
    pub deleted_cases: u64,
    pub warnings: Vec<String>,
}

impl SyncOutcome {
    pub fn total(&self) -> u64 {
        self.created_suites
            + self.created_cases
            + self.renamed_suites
            + self.renamed_cases
            + self.updated_cases
            + self.deleted_suites
            + self.deleted_cases
    }
}

/// [`SyncService`] over HTTP.
pub struct HttpSyncService {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpSyncService {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, project_id: i64, tail: &str) -> String {
        format!("{}/projects/{}/{}", self.base_url, project_id, tail)
    }

    async fn send(&self, call: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .with_context(|| format!("{} failed: service unreachable", call))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body_text = response.text().await.unwrap_or_default();
        bail!("{} failed ({}): {}", call, status, error_message(&body_text));
    }
}

#[async_trait]
impl SyncService for HttpSyncService {
    async fn fetch_sync_state(&self, project_id: i64) -> Result<SyncState> {
        let url = self.url(project_id, "sync-state");
        tracing::debug!(%url, "fetching sync state");
        let response = self
            .send("fetch sync state", self.client.get(&url))
            .await?;
        response
            .json::<SyncState>()
            .await
            .with_context(|| "fetch sync state: invalid response body")
    }

    async fn resolve_identities(&self, request: &ResolveRequest) -> Result<IdentityMap> {
        let url = self.url(request.project_id, "sync/resolve");
        tracing::debug!(
            %url,
            features = request.features.len(),
            scenarios = request.scenarios.len(),
            "resolving identities"
        );
        let response = self
            .send("resolve identities", self.client.post(&url).json(request))
            .await?;
        let body: ResolveResponse = response
            .json()
            .await
            .with_context(|| "resolve identities: invalid response body")?;
        Ok(body.results)
    }

    async fn submit_delta(&self, delta: &SyncDelta) -> Result<SyncOutcome> {
        let url = self.url(delta.project_id, "sync");
        tracing::debug!(%url, changes = delta.changes.len(), "submitting delta");
        let response = self
            .send("submit delta", self.client.post(&url).json(delta))
            .await?;
        response
            .json::<SyncOutcome>()
            .await
            .with_context(|| "submit delta: invalid response body")
    }
}

/// Pull a human-readable message out of an error body: the `message` or
/// `error` string of a JSON body, else the raw text.
fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "(empty response body)".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message": "project not found"}"#), "project not found");
        assert_eq!(error_message(r#"{"error": "bad token"}"#), "bad token");
        assert_eq!(error_message("Gateway Timeout\n"), "Gateway Timeout");
        assert_eq!(error_message(""), "(empty response body)");
        assert_eq!(error_message(r#"{"code": 5}"#), r#"{"code": 5}"#);
    }

    #[test]
    fn test_outcome_defaults_missing_counts() {
        let outcome: SyncOutcome =
            serde_json::from_str(r#"{"createdCases": 2, "warnings": ["dup title"]}"#).unwrap();
        assert_eq!(outcome.created_cases, 2);
        assert_eq!(outcome.deleted_suites, 0);
        assert_eq!(outcome.warnings, vec!["dup title"]);
        assert_eq!(outcome.total(), 2);
    }

    #[test]
    fn test_resolve_response_envelope() {
        let body: ResolveResponse = serde_json::from_str(
            r#"{"results": {"suites": {"f1": {"suiteId": 4}}}}"#,
        )
        .unwrap();
        assert_eq!(body.results.suite_id("f1"), Some(4));
        assert!(body.results.cases.is_empty());

        let empty: ResolveResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.results.is_empty());
    }

    #[test]
    fn test_sync_state_null_commit() {
        let state: SyncState = serde_json::from_str(r#"{"lastSyncedCommit": null}"#).unwrap();
        assert_eq!(state.last_synced_commit, None);
    }
}
