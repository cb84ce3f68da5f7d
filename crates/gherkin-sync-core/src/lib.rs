//! # Gherkin Sync Core
//!
//! The reconciliation core of gherkin-sync: everything needed to turn two
//! revisions of a set of feature files into an identity-preserving delta.
//!
//! This crate performs no process, network, or filesystem I/O. The
//! application crate supplies file contents and remote identities; the
//! functions here are pure.
//!
//! ```text
//! diff records ──▶ classify ──▶ FileChange
//!                                  │  (app: fetch old/new content)
//!                                  ▼
//!                   extract + hash ──▶ ProcessedChange
//!                                  │  (app: resolve identities)
//!                                  ▼
//!                 matcher + payload ──▶ SyncDelta
//! ```

pub mod classify;
pub mod extract;
pub mod hash;
pub mod matcher;
pub mod models;
pub mod payload;
