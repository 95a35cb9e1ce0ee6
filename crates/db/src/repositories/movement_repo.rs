//! Repository for the `movements` table.

use patrimonio_core::entity::QueryMode;
use patrimonio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::movement::{CreateMovement, Movement};

const COLUMNS: &str = "id, asset_id, origin_office_id, destination_office_id, reason, \
    observations, confirmed, confirmed_at, created_by, deleted_at, deleted_by, \
    deletion_reason, created_at, updated_at";

/// Provides data access for asset movements.
pub struct MovementRepo;

impl MovementRepo {
    pub async fn create<'e, E>(
        executor: E,
        asset_id: DbId,
        origin_office_id: DbId,
        input: &CreateMovement,
        created_by: Option<DbId>,
    ) -> Result<Movement, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO movements
                (asset_id, origin_office_id, destination_office_id, reason, observations,
                 created_by)
             VALUES ($1, $2, $3, $4, COALESCE($5, ''), $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Movement>(&query)
            .bind(asset_id)
            .bind(origin_office_id)
            .bind(input.destination_office_id)
            .bind(&input.reason)
            .bind(&input.observations)
            .bind(created_by)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        id: DbId,
        mode: QueryMode,
    ) -> Result<Option<Movement>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM movements WHERE id = $1 AND {}",
            mode.predicate()
        );
        sqlx::query_as::<_, Movement>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Movements of one asset, oldest first.
    pub async fn list_by_asset<'e, E>(
        executor: E,
        asset_id: DbId,
        mode: QueryMode,
    ) -> Result<Vec<Movement>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM movements WHERE asset_id = $1 AND {} ORDER BY created_at, id",
            mode.predicate()
        );
        sqlx::query_as::<_, Movement>(&query)
            .bind(asset_id)
            .fetch_all(executor)
            .await
    }

    /// Ids of active movements of an asset that have not been confirmed.
    pub async fn unconfirmed_ids<'e, E>(executor: E, asset_id: DbId) -> Result<Vec<DbId>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM movements \
             WHERE asset_id = $1 AND confirmed = FALSE AND deleted_at IS NULL \
             ORDER BY id",
        )
        .bind(asset_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Ids of every active movement of an asset.
    pub async fn active_ids<'e, E>(executor: E, asset_id: DbId) -> Result<Vec<DbId>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM movements WHERE asset_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(asset_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Mark an active, unconfirmed movement as confirmed.
    ///
    /// Returns `None` if the movement does not exist, is deleted, or was
    /// already confirmed.
    pub async fn confirm<'e, E>(executor: E, id: DbId) -> Result<Option<Movement>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE movements SET confirmed = TRUE, confirmed_at = NOW()
             WHERE id = $1 AND confirmed = FALSE AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Movement>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
