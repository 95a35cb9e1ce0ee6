//! The sync engine: batch intake, session replay and conflict handling.

use std::sync::Arc;

use chrono::Utc;
use patrimonio_core::notifications::{Priority, KIND_SYNC_CONFLICT};
use patrimonio_core::permissions::{Capability, Principal};
use patrimonio_core::sync::{
    validate_device_id, validate_local_timestamp, ChangeType, Resolution, SyncState,
    MAX_BATCH_SIZE,
};
use patrimonio_core::types::DbId;
use patrimonio_db::models::sync::{
    CreateSyncConflict, OfflineChange, SessionTally, SubmittedChange, SyncConflict, SyncSession,
};
use patrimonio_db::repositories::{OfflineChangeRepo, SyncConflictRepo, SyncSessionRepo};
use patrimonio_db::DbPool;
use patrimonio_events::bus::EVENT_SYNC_SESSION_FINISHED;
use patrimonio_events::{EventBus, NotificationMessage, Notifier, PlatformEvent};
use serde::Serialize;

use crate::error::SyncError;
use crate::replay::{apply_change, Applied, DetectedConflict};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A session together with the changes it covers.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedBatch {
    pub session: SyncSession,
    pub changes: Vec<OfflineChange>,
}

/// How one replay attempt ended.
#[derive(Debug, Clone)]
pub enum ReplayOutcome {
    Completed,
    Conflict(SyncConflict),
    Error(String),
    /// The change was not pending, e.g. another worker claimed it first.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConflict {
    pub conflict: SyncConflict,
    pub change: OfflineChange,
}

impl ResolvedConflict {
    /// Whether the change went back to the queue and needs another replay.
    pub fn needs_replay(&self) -> bool {
        self.change.sync_state == SyncState::Pending.as_str()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session: SyncSession,
    pub changes: Vec<OfflineChange>,
    /// Unresolved conflicts of the session owner, across all sessions.
    pub conflicts: Vec<SyncConflict>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Shared handle to the sync machinery. Cheap to clone.
#[derive(Clone)]
pub struct SyncEngine {
    pool: DbPool,
    notifier: Arc<dyn Notifier>,
    events: Arc<EventBus>,
}

impl SyncEngine {
    pub fn new(pool: DbPool, notifier: Arc<dyn Notifier>, events: Arc<EventBus>) -> Self {
        Self {
            pool,
            notifier,
            events,
        }
    }

    // ── Intake ────────────────────────────────────────────────────────

    /// Validate a device batch and store it as a new session.
    ///
    /// The whole batch is refused on the first invalid change; nothing is
    /// stored in that case.
    pub async fn submit_batch(
        &self,
        principal: &Principal,
        device_id: &str,
        changes: Vec<SubmittedChange>,
    ) -> Result<SubmittedBatch, SyncError> {
        principal.require(Capability::MobileSync)?;
        validate_device_id(device_id).map_err(SyncError::Validation)?;
        let device_id = device_id.trim();

        if changes.is_empty() {
            return Err(SyncError::Validation("changes must not be empty".into()));
        }
        if changes.len() > MAX_BATCH_SIZE {
            return Err(SyncError::Validation(format!(
                "A batch may hold at most {MAX_BATCH_SIZE} changes"
            )));
        }

        let now = Utc::now();
        for (index, change) in changes.iter().enumerate() {
            validate_local_timestamp(change.local_timestamp, now)
                .map_err(|e| SyncError::Validation(format!("change {index}: {e}")))?;
            if !change.payload.is_object() {
                return Err(SyncError::Validation(format!(
                    "change {index}: payload must be a JSON object"
                )));
            }
            let has_scan_code = change
                .scan_code
                .as_deref()
                .is_some_and(|code| !code.trim().is_empty());
            if change.change_type != ChangeType::Create
                && !has_scan_code
                && change.target_identifier.trim().is_empty()
            {
                return Err(SyncError::Validation(format!(
                    "change {index}: target_identifier or scan_code is required"
                )));
            }
        }

        let total = i32::try_from(changes.len())
            .map_err(|_| SyncError::Validation("batch is too large".into()))?;

        let mut tx = self.pool.begin().await?;
        let session =
            SyncSessionRepo::create(&mut *tx, principal.user_id, device_id, total).await?;
        let mut records = Vec::with_capacity(changes.len());
        for (position, change) in (0_i32..).zip(&changes) {
            let record = OfflineChangeRepo::create(
                &mut *tx,
                principal.user_id,
                session.id,
                position,
                device_id,
                change,
            )
            .await?;
            records.push(record);
        }
        tx.commit().await?;

        tracing::info!(
            session_id = session.id,
            user_id = principal.user_id,
            device_id,
            total,
            "Sync batch accepted"
        );
        Ok(SubmittedBatch {
            session,
            changes: records,
        })
    }

    // ── Replay ────────────────────────────────────────────────────────

    /// Replay every pending change of a session in submission order and
    /// write the final tallies.
    pub async fn process_session(&self, session_id: DbId) -> Result<SyncSession, SyncError> {
        let session = SyncSessionRepo::find_by_id(&self.pool, session_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "SyncSession",
                id: session_id,
            })?;
        let changes = OfflineChangeRepo::list_by_session(&self.pool, session_id).await?;

        let mut tally = SessionTally::default();
        for change in changes
            .iter()
            .filter(|c| c.sync_state == SyncState::Pending.as_str())
        {
            match self.replay_change(change.id).await {
                Ok(ReplayOutcome::Completed) => tally.succeeded += 1,
                Ok(ReplayOutcome::Conflict(_)) => tally.conflicted += 1,
                Ok(ReplayOutcome::Error(_)) => tally.failed += 1,
                Ok(ReplayOutcome::Skipped) => continue,
                Err(e) => {
                    tracing::error!(change_id = change.id, session_id, error = %e, "Replay failed");
                    tally.failed += 1;
                }
            }
            tally.processed += 1;
        }

        let message = format!(
            "Processed {} of {}: {} succeeded, {} failed, {} conflicts",
            tally.processed,
            session.total_changes,
            tally.succeeded,
            tally.failed,
            tally.conflicted
        );
        let finished = SyncSessionRepo::finish(&self.pool, session_id, tally, &message)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "SyncSession",
                id: session_id,
            })?;

        tracing::info!(session_id, user_id = finished.user_id, %message, "Sync session finished");
        self.events.publish(
            PlatformEvent::new(EVENT_SYNC_SESSION_FINISHED)
                .with_source("sync_session", session_id)
                .with_actor(finished.user_id)
                .with_payload(serde_json::json!({
                    "processed": tally.processed,
                    "succeeded": tally.succeeded,
                    "failed": tally.failed,
                    "conflicted": tally.conflicted,
                })),
        );
        Ok(finished)
    }

    /// Claim a pending change and apply it.
    ///
    /// Returns `Err` only when the change does not exist or its outcome
    /// could not be stored.
    pub async fn replay_change(&self, change_id: DbId) -> Result<ReplayOutcome, SyncError> {
        let Some(change) = OfflineChangeRepo::claim(&self.pool, change_id).await? else {
            return match OfflineChangeRepo::find_by_id(&self.pool, change_id).await? {
                Some(_) => Ok(ReplayOutcome::Skipped),
                None => Err(SyncError::NotFound {
                    entity: "OfflineChange",
                    id: change_id,
                }),
            };
        };

        match self.apply_claimed(&change).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(change_id, user_id = change.user_id, error = %message, "Offline change failed");
                OfflineChangeRepo::mark_error(&self.pool, change_id, &message).await?;
                Ok(ReplayOutcome::Error(message))
            }
        }
    }

    async fn apply_claimed(&self, change: &OfflineChange) -> Result<ReplayOutcome, SyncError> {
        let mut tx = self.pool.begin().await?;
        match apply_change(&mut *tx, change).await {
            Ok(Applied::Done { written_asset_id }) => {
                OfflineChangeRepo::mark_completed(&mut *tx, change.id, written_asset_id).await?;
                tx.commit().await?;
                tracing::debug!(change_id = change.id, kind = %change.change_type, "Offline change applied");
                Ok(ReplayOutcome::Completed)
            }
            Ok(Applied::Conflict(detected)) => {
                tx.rollback().await?;
                let conflict = self.record_conflict(change, detected).await?;
                Ok(ReplayOutcome::Conflict(conflict))
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Store the conflict and flip the change to `conflict` together, then
    /// tell the owner.
    async fn record_conflict(
        &self,
        change: &OfflineChange,
        detected: DetectedConflict,
    ) -> Result<SyncConflict, SyncError> {
        let mut tx = self.pool.begin().await?;
        let conflict = SyncConflictRepo::upsert(
            &mut *tx,
            &CreateSyncConflict {
                offline_change_id: change.id,
                conflict_kind: detected.kind,
                server_snapshot: detected.server_snapshot,
                client_payload: change.payload.clone(),
                detail: detected.detail.clone(),
            },
        )
        .await?;
        OfflineChangeRepo::mark_conflict(&mut *tx, change.id, &detected.detail).await?;
        tx.commit().await?;

        tracing::info!(
            change_id = change.id,
            conflict_id = conflict.id,
            kind = detected.kind.as_str(),
            user_id = change.user_id,
            "Sync conflict recorded"
        );

        let message = NotificationMessage::new(
            KIND_SYNC_CONFLICT,
            "Sync conflict",
            format!(
                "A {} change from device {} needs your decision: {}",
                change.change_type, change.device_id, detected.detail
            ),
        )
        .with_priority(Priority::High)
        .with_payload(serde_json::json!({
            "conflict_id": conflict.id,
            "change_id": change.id,
            "conflict_kind": detected.kind.as_str(),
        }));
        if let Err(e) = self.notifier.notify(change.user_id, &message).await {
            tracing::warn!(conflict_id = conflict.id, user_id = change.user_id, error = %e, "Conflict notification failed");
        }
        Ok(conflict)
    }

    // ── Resolution ────────────────────────────────────────────────────

    /// Close a conflict and move its change on.
    ///
    /// `keep_server` completes the change without applying it. `keep_client`
    /// and `manual` send it back to `pending`; the caller replays it.
    pub async fn resolve_conflict(
        &self,
        principal: &Principal,
        conflict_id: DbId,
        resolution: Resolution,
        manual_payload: Option<serde_json::Value>,
    ) -> Result<ResolvedConflict, SyncError> {
        principal.require(Capability::MobileSync)?;
        let manual_payload = match resolution {
            Resolution::Manual => match manual_payload {
                Some(payload) if payload.is_object() => Some(payload),
                _ => return Err(SyncError::MissingManualPayload),
            },
            Resolution::KeepServer | Resolution::KeepClient => None,
        };

        let mut tx = self.pool.begin().await?;
        let conflict = SyncConflictRepo::lock_by_id(&mut *tx, conflict_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "SyncConflict",
                id: conflict_id,
            })?;
        let change_id = conflict.offline_change_id;
        let change = OfflineChangeRepo::lock_by_id(&mut *tx, change_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "OfflineChange",
                id: change_id,
            })?;
        if change.user_id != principal.user_id {
            principal.require(Capability::RestoreOthers)?;
        }
        if conflict.resolved {
            return Err(SyncError::AlreadyResolved { conflict_id });
        }

        let conflict = SyncConflictRepo::mark_resolved(
            &mut *tx,
            conflict_id,
            resolution,
            principal.user_id,
            Utc::now(),
        )
        .await?
        .ok_or(SyncError::AlreadyResolved { conflict_id })?;
        let moved = OfflineChangeRepo::apply_resolution(
            &mut *tx,
            change_id,
            resolution,
            manual_payload.as_ref(),
        )
        .await?;
        if !moved {
            return Err(SyncError::NotAwaitingResolution { change_id });
        }
        let change = OfflineChangeRepo::find_by_id(&mut *tx, change_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "OfflineChange",
                id: change_id,
            })?;
        tx.commit().await?;

        tracing::info!(
            conflict_id,
            change_id,
            resolution = resolution.as_str(),
            user_id = principal.user_id,
            "Sync conflict resolved"
        );
        Ok(ResolvedConflict { conflict, change })
    }

    // ── Retry ─────────────────────────────────────────────────────────

    /// Move a device's failed changes into a fresh session.
    ///
    /// Returns `None` when nothing was waiting for a retry.
    pub async fn retry_failed(
        &self,
        principal: &Principal,
        device_id: &str,
    ) -> Result<Option<SubmittedBatch>, SyncError> {
        principal.require(Capability::MobileSync)?;
        validate_device_id(device_id).map_err(SyncError::Validation)?;
        let device_id = device_id.trim();

        let mut tx = self.pool.begin().await?;
        let session = SyncSessionRepo::create(&mut *tx, principal.user_id, device_id, 0).await?;
        let changes =
            OfflineChangeRepo::retry_errors(&mut *tx, principal.user_id, device_id, session.id)
                .await?;
        if changes.is_empty() {
            tx.rollback().await?;
            return Ok(None);
        }

        let total = i32::try_from(changes.len())
            .map_err(|_| SyncError::Internal("retry batch is too large".into()))?;
        SyncSessionRepo::set_total(&mut *tx, session.id, total).await?;
        tx.commit().await?;

        tracing::info!(
            session_id = session.id,
            user_id = principal.user_id,
            device_id,
            total,
            "Failed changes queued for retry"
        );
        Ok(Some(SubmittedBatch {
            session: SyncSession {
                total_changes: total,
                ..session
            },
            changes,
        }))
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// The caller's changes still waiting for replay or retry.
    pub async fn pending_changes(
        &self,
        principal: &Principal,
    ) -> Result<Vec<OfflineChange>, SyncError> {
        principal.require(Capability::MobileSync)?;
        Ok(OfflineChangeRepo::list_pending_for_user(&self.pool, principal.user_id).await?)
    }

    pub async fn session_status(
        &self,
        principal: &Principal,
        session_id: DbId,
    ) -> Result<SessionStatus, SyncError> {
        let session = SyncSessionRepo::find_by_id(&self.pool, session_id)
            .await?
            .ok_or(SyncError::NotFound {
                entity: "SyncSession",
                id: session_id,
            })?;
        if session.user_id == principal.user_id {
            principal.require(Capability::MobileSync)?;
        } else {
            principal.require(Capability::RestoreOthers)?;
        }

        let changes = OfflineChangeRepo::list_by_session(&self.pool, session_id).await?;
        let conflicts =
            SyncConflictRepo::list_unresolved_for_user(&self.pool, session.user_id).await?;
        Ok(SessionStatus {
            session,
            changes,
            conflicts,
        })
    }
}
