//! Repositories for the mobile sync tables: `sync_sessions`,
//! `offline_changes` and `sync_conflicts`.

use patrimonio_core::sync::{Resolution, SyncState};
use patrimonio_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::sync::{
    CreateSyncConflict, OfflineChange, SessionTally, SubmittedChange, SyncConflict, SyncSession,
};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

const SESSION_COLUMNS: &str = "id, user_id, device_id, total_changes, processed_changes, \
    succeeded_changes, failed_changes, conflict_changes, is_complete, result_message, \
    started_at, finished_at, created_at, updated_at";

/// Provides access to sync sessions.
pub struct SyncSessionRepo;

impl SyncSessionRepo {
    pub async fn create<'e, E>(
        executor: E,
        user_id: DbId,
        device_id: &str,
        total_changes: i32,
    ) -> Result<SyncSession, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO sync_sessions (user_id, device_id, total_changes)
             VALUES ($1, $2, $3)
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, SyncSession>(&query)
            .bind(user_id)
            .bind(device_id)
            .bind(total_changes)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<SyncSession>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {SESSION_COLUMNS} FROM sync_sessions WHERE id = $1");
        sqlx::query_as::<_, SyncSession>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Set the number of changes a session covers. Used by retry sessions,
    /// whose size is known only after the errored changes are moved.
    pub async fn set_total<'e, E>(executor: E, id: DbId, total_changes: i32) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE sync_sessions SET total_changes = $2 WHERE id = $1")
            .bind(id)
            .bind(total_changes)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write final tallies and mark the session complete.
    pub async fn finish<'e, E>(
        executor: E,
        id: DbId,
        tally: SessionTally,
        result_message: &str,
    ) -> Result<Option<SyncSession>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE sync_sessions SET
                processed_changes = $2,
                succeeded_changes = $3,
                failed_changes = $4,
                conflict_changes = $5,
                result_message = $6,
                is_complete = TRUE,
                finished_at = NOW()
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, SyncSession>(&query)
            .bind(id)
            .bind(tally.processed)
            .bind(tally.succeeded)
            .bind(tally.failed)
            .bind(tally.conflicted)
            .bind(result_message)
            .fetch_optional(executor)
            .await
    }
}

// ---------------------------------------------------------------------------
// Offline changes
// ---------------------------------------------------------------------------

const CHANGE_COLUMNS: &str = "id, user_id, session_id, batch_position, change_type, \
    local_timestamp, target_identifier, scan_code, payload, sync_state, attempt_count, \
    last_attempt_at, error_message, device_id, gps_location, bypass_staleness, \
    applied_asset_id, applied_at, created_at, updated_at";

/// Provides access to queued offline changes and their state transitions.
///
/// Every transition is guarded on the expected current state so a change
/// can never skip a step of the replay state machine.
pub struct OfflineChangeRepo;

impl OfflineChangeRepo {
    pub async fn create<'e, E>(
        executor: E,
        user_id: DbId,
        session_id: DbId,
        batch_position: i32,
        device_id: &str,
        input: &SubmittedChange,
    ) -> Result<OfflineChange, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO offline_changes
                (user_id, session_id, batch_position, change_type, local_timestamp,
                 target_identifier, scan_code, payload, device_id, gps_location)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {CHANGE_COLUMNS}"
        );
        sqlx::query_as::<_, OfflineChange>(&query)
            .bind(user_id)
            .bind(session_id)
            .bind(batch_position)
            .bind(input.change_type.as_str())
            .bind(input.local_timestamp)
            .bind(input.target_identifier.trim())
            .bind(&input.scan_code)
            .bind(&input.payload)
            .bind(device_id)
            .bind(&input.gps_location)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<OfflineChange>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {CHANGE_COLUMNS} FROM offline_changes WHERE id = $1");
        sqlx::query_as::<_, OfflineChange>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn lock_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<OfflineChange>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {CHANGE_COLUMNS} FROM offline_changes WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, OfflineChange>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// A session's changes in submission order. Retried changes keep their
    /// original `created_at`, so capture order survives a retry.
    pub async fn list_by_session<'e, E>(
        executor: E,
        session_id: DbId,
    ) -> Result<Vec<OfflineChange>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {CHANGE_COLUMNS} FROM offline_changes
             WHERE session_id = $1
             ORDER BY created_at, batch_position, id"
        );
        sqlx::query_as::<_, OfflineChange>(&query)
            .bind(session_id)
            .fetch_all(executor)
            .await
    }

    /// Move a pending change to processing and count the attempt.
    ///
    /// Returns `None` if the change is not pending (another worker got it).
    pub async fn claim<'e, E>(executor: E, id: DbId) -> Result<Option<OfflineChange>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE offline_changes SET
                sync_state = 'processing',
                attempt_count = attempt_count + 1,
                last_attempt_at = NOW()
             WHERE id = $1 AND sync_state = 'pending'
             RETURNING {CHANGE_COLUMNS}"
        );
        sqlx::query_as::<_, OfflineChange>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Processing -> completed. Consumes the staleness bypass.
    ///
    /// `written_asset_id` is the asset row the change wrote, if any. It is
    /// stamped with the transaction time, which equals the asset's
    /// `updated_at` when both happen in the same transaction.
    pub async fn mark_completed<'e, E>(
        executor: E,
        id: DbId,
        written_asset_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE offline_changes SET sync_state = 'completed', error_message = NULL, \
             bypass_staleness = FALSE, applied_asset_id = $2, \
             applied_at = CASE WHEN $2::BIGINT IS NULL THEN NULL ELSE NOW() END \
             WHERE id = $1 AND sync_state = 'processing'",
        )
        .bind(id)
        .bind(written_asset_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether the asset's current version was written by an earlier change
    /// from the same user and device.
    ///
    /// A device that captured several edits to one asset offline has already
    /// seen its own earlier writes, so they must not make later ones stale.
    pub async fn last_write_is_own<'e, E>(
        executor: E,
        change: &OfflineChange,
        asset_id: DbId,
        asset_updated_at: Timestamp,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                SELECT 1 FROM offline_changes \
                WHERE user_id = $1 AND device_id = $2 AND id <> $3 \
                  AND sync_state = 'completed' \
                  AND applied_asset_id = $4 AND applied_at = $5 \
                  AND local_timestamp <= $6 \
             )",
        )
        .bind(change.user_id)
        .bind(&change.device_id)
        .bind(change.id)
        .bind(asset_id)
        .bind(asset_updated_at)
        .bind(change.local_timestamp)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    /// Processing -> error, keeping the failure detail.
    pub async fn mark_error<'e, E>(executor: E, id: DbId, message: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE offline_changes SET sync_state = 'error', error_message = $2 \
             WHERE id = $1 AND sync_state = 'processing'",
        )
        .bind(id)
        .bind(message)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Processing -> conflict.
    pub async fn mark_conflict<'e, E>(executor: E, id: DbId, detail: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE offline_changes SET sync_state = 'conflict', error_message = $2 \
             WHERE id = $1 AND sync_state = 'processing'",
        )
        .bind(id)
        .bind(detail)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply a conflict resolution to a change in the conflict state.
    ///
    /// `payload` replaces the stored payload when given (manual resolution).
    pub async fn apply_resolution<'e, E>(
        executor: E,
        id: DbId,
        resolution: Resolution,
        payload: Option<&serde_json::Value>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let next = resolution.next_state();
        let bypass = resolution.bypasses_staleness();
        let result = sqlx::query(
            "UPDATE offline_changes SET
                sync_state = $2,
                bypass_staleness = $3,
                payload = COALESCE($4, payload),
                error_message = NULL
             WHERE id = $1 AND sync_state = 'conflict'",
        )
        .bind(id)
        .bind(next.as_str())
        .bind(bypass)
        .bind(payload)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// A user's changes still waiting for replay or retry, oldest first.
    pub async fn list_pending_for_user<'e, E>(
        executor: E,
        user_id: DbId,
    ) -> Result<Vec<OfflineChange>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {CHANGE_COLUMNS} FROM offline_changes
             WHERE user_id = $1 AND sync_state IN ('pending', 'error')
             ORDER BY created_at, batch_position, id"
        );
        sqlx::query_as::<_, OfflineChange>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }

    /// Count a user's changes in one state.
    pub async fn count_in_state<'e, E>(
        executor: E,
        user_id: DbId,
        state: SyncState,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM offline_changes WHERE user_id = $1 AND sync_state = $2",
        )
        .bind(user_id)
        .bind(state.as_str())
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    /// Error -> pending for one device, re-attached to `session_id` and
    /// with the attempt counter reset. Returns the moved changes in their
    /// original order.
    pub async fn retry_errors<'e, E>(
        executor: E,
        user_id: DbId,
        device_id: &str,
        session_id: DbId,
    ) -> Result<Vec<OfflineChange>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "WITH moved AS (
                UPDATE offline_changes SET
                    sync_state = 'pending',
                    attempt_count = 0,
                    error_message = NULL,
                    session_id = $3
                WHERE user_id = $1 AND device_id = $2 AND sync_state = 'error'
                RETURNING {CHANGE_COLUMNS}
             )
             SELECT {CHANGE_COLUMNS} FROM moved ORDER BY created_at, batch_position, id"
        );
        sqlx::query_as::<_, OfflineChange>(&query)
            .bind(user_id)
            .bind(device_id)
            .bind(session_id)
            .fetch_all(executor)
            .await
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

const CONFLICT_COLUMNS: &str = "id, offline_change_id, conflict_kind, server_snapshot, \
    client_payload, detail, resolution, resolved, resolved_by, resolved_at, created_at";

/// Provides access to sync conflict records.
pub struct SyncConflictRepo;

impl SyncConflictRepo {
    /// Record a conflict for a change. A change that conflicts again after a
    /// resolution reuses its row, which is reset to unresolved.
    pub async fn upsert<'e, E>(
        executor: E,
        input: &CreateSyncConflict,
    ) -> Result<SyncConflict, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO sync_conflicts
                (offline_change_id, conflict_kind, server_snapshot, client_payload, detail)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (offline_change_id) DO UPDATE SET
                conflict_kind = EXCLUDED.conflict_kind,
                server_snapshot = EXCLUDED.server_snapshot,
                client_payload = EXCLUDED.client_payload,
                detail = EXCLUDED.detail,
                resolution = NULL,
                resolved = FALSE,
                resolved_by = NULL,
                resolved_at = NULL,
                created_at = NOW()
             RETURNING {CONFLICT_COLUMNS}"
        );
        sqlx::query_as::<_, SyncConflict>(&query)
            .bind(input.offline_change_id)
            .bind(input.conflict_kind.as_str())
            .bind(&input.server_snapshot)
            .bind(&input.client_payload)
            .bind(&input.detail)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<SyncConflict>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {CONFLICT_COLUMNS} FROM sync_conflicts WHERE id = $1");
        sqlx::query_as::<_, SyncConflict>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn lock_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<SyncConflict>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {CONFLICT_COLUMNS} FROM sync_conflicts WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, SyncConflict>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_change<'e, E>(
        executor: E,
        offline_change_id: DbId,
    ) -> Result<Option<SyncConflict>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query =
            format!("SELECT {CONFLICT_COLUMNS} FROM sync_conflicts WHERE offline_change_id = $1");
        sqlx::query_as::<_, SyncConflict>(&query)
            .bind(offline_change_id)
            .fetch_optional(executor)
            .await
    }

    /// Close a conflict. Guarded on `resolved = FALSE`.
    pub async fn mark_resolved<'e, E>(
        executor: E,
        id: DbId,
        resolution: Resolution,
        resolved_by: DbId,
        resolved_at: Timestamp,
    ) -> Result<Option<SyncConflict>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE sync_conflicts SET
                resolution = $2, resolved = TRUE, resolved_by = $3, resolved_at = $4
             WHERE id = $1 AND resolved = FALSE
             RETURNING {CONFLICT_COLUMNS}"
        );
        sqlx::query_as::<_, SyncConflict>(&query)
            .bind(id)
            .bind(resolution.as_str())
            .bind(resolved_by)
            .bind(resolved_at)
            .fetch_optional(executor)
            .await
    }

    /// Unresolved conflicts on changes owned by `user_id`, newest first.
    pub async fn list_unresolved_for_user<'e, E>(
        executor: E,
        user_id: DbId,
    ) -> Result<Vec<SyncConflict>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let columns = CONFLICT_COLUMNS
            .split(", ")
            .map(|c| format!("c.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT {columns} FROM sync_conflicts c
             JOIN offline_changes o ON o.id = c.offline_change_id
             WHERE o.user_id = $1 AND c.resolved = FALSE
             ORDER BY c.created_at DESC, c.id DESC"
        );
        sqlx::query_as::<_, SyncConflict>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }
}
