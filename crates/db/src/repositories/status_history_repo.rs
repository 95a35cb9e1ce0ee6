//! Repository for the `status_history` table.

use patrimonio_core::entity::QueryMode;
use patrimonio_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::status_history::{CreateStatusHistory, StatusHistory};

const COLUMNS: &str = "id, asset_id, previous_condition, new_condition, observations, \
    changed_by, gps_location, changed_at, deleted_at, deleted_by, deletion_reason, \
    created_at, updated_at";

/// Provides data access for asset condition history.
pub struct StatusHistoryRepo;

impl StatusHistoryRepo {
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateStatusHistory,
    ) -> Result<StatusHistory, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO status_history
                (asset_id, previous_condition, new_condition, observations, changed_by,
                 gps_location)
             VALUES ($1, $2, $3, COALESCE($4, ''), $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StatusHistory>(&query)
            .bind(input.asset_id)
            .bind(&input.previous_condition)
            .bind(&input.new_condition)
            .bind(&input.observations)
            .bind(input.changed_by)
            .bind(&input.gps_location)
            .fetch_one(executor)
            .await
    }

    /// History of one asset, newest first.
    ///
    /// Reports on a deleted asset's past pass [`QueryMode::All`]; the asset
    /// row itself is not joined, so a soft-deleted parent never hides history.
    pub async fn list_by_asset<'e, E>(
        executor: E,
        asset_id: DbId,
        mode: QueryMode,
    ) -> Result<Vec<StatusHistory>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM status_history WHERE asset_id = $1 AND {} \
             ORDER BY changed_at DESC, id DESC",
            mode.predicate()
        );
        sqlx::query_as::<_, StatusHistory>(&query)
            .bind(asset_id)
            .fetch_all(executor)
            .await
    }

    /// Active history rows recorded at or after `since`.
    pub async fn count_since<'e, E>(executor: E, since: Timestamp) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM status_history WHERE deleted_at IS NULL AND changed_at >= $1",
        )
        .bind(since)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    /// Ids of every active history row of an asset.
    pub async fn active_ids<'e, E>(executor: E, asset_id: DbId) -> Result<Vec<DbId>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM status_history WHERE asset_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(asset_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}
