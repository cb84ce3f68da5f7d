//! # Gherkin Sync
//!
//! Keeps the Gherkin feature files of a Git repository in step with a remote
//! test-management service, preserving the identity of suites (feature
//! files) and cases (scenarios) across renames, edits, and restructuring.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────┐   ┌──────────────┐
//! │   git    │──▶│  Orchestrator            │──▶│ Remote       │
//! │ (Vcs)    │   │  classify → process →    │   │ service      │
//! └──────────┘   │  resolve → build delta   │◀──│ (SyncService)│
//!                └──────────────────────────┘   └──────────────┘
//! ```
//!
//! The reconciliation algorithms (hashing, extraction, classification,
//! matching, delta building) live in the `gherkin-sync-core` crate; this
//! crate supplies the collaborators and the `gsync` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and CLI/env resolution |
//! | [`git`] | Read-only version-control access |
//! | [`api`] | Remote service HTTP client |
//! | [`process`] | Per-file extraction of old and new revisions |
//! | [`resolve`] | Batched identity resolution |
//! | [`progress`] | Phase and progress reporting |
//! | [`sync`] | Orchestrator and run summary |

pub mod api;
pub mod config;
pub mod git;
pub mod process;
pub mod progress;
pub mod resolve;
pub mod sync;
