//! Offline mobile sync: batch intake, ordered replay, conflict recording
//! and conflict resolution.
//!
//! A device submits a batch of [`SubmittedChange`]s. The batch becomes a
//! session whose changes replay strictly in submission order; each change
//! ends `completed`, `error` or `conflict`. Conflicts are records the user
//! resolves later, never errors.
//!
//! [`SubmittedChange`]: patrimonio_db::models::sync::SubmittedChange

pub mod engine;
pub mod error;
mod replay;

pub use engine::{ReplayOutcome, ResolvedConflict, SessionStatus, SubmittedBatch, SyncEngine};
pub use error::SyncError;
