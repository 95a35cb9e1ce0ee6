//! Repository for the `assets` table.

use patrimonio_core::entity::QueryMode;
use patrimonio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::asset::{Asset, CreateAsset, UpdateAsset};

const COLUMNS: &str = "id, asset_code, internal_code, catalog_item_id, office_id, condition, \
    brand, model, color, serial, dimensions, plate, observations, qr_code, created_by, \
    updated_by, deleted_at, deleted_by, deletion_reason, created_at, updated_at";

/// Provides CRUD operations for assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Insert a new asset. `qr_code` must already be filled in by the caller.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateAsset,
        qr_code: &str,
        created_by: Option<DbId>,
    ) -> Result<Asset, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO assets
                (asset_code, internal_code, catalog_item_id, office_id, condition, brand,
                 model, color, serial, dimensions, plate, observations, qr_code,
                 created_by, updated_by)
             VALUES ($1, COALESCE($2, ''), $3, $4, COALESCE($5, 'B'), COALESCE($6, ''),
                     COALESCE($7, ''), COALESCE($8, ''), COALESCE($9, ''), COALESCE($10, ''),
                     COALESCE($11, ''), COALESCE($12, ''), $13, $14, $14)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(&input.asset_code)
            .bind(&input.internal_code)
            .bind(input.catalog_item_id)
            .bind(input.office_id)
            .bind(&input.condition)
            .bind(&input.brand)
            .bind(&input.model)
            .bind(&input.color)
            .bind(&input.serial)
            .bind(&input.dimensions)
            .bind(&input.plate)
            .bind(&input.observations)
            .bind(qr_code)
            .bind(created_by)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        id: DbId,
        mode: QueryMode,
    ) -> Result<Option<Asset>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM assets WHERE id = $1 AND {}",
            mode.predicate()
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock an asset row, deleted or not, for the rest of the transaction.
    pub async fn lock_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Asset>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM assets WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Look up an asset by its business key.
    pub async fn find_by_asset_code<'e, E>(
        executor: E,
        asset_code: &str,
        mode: QueryMode,
    ) -> Result<Option<Asset>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM assets WHERE asset_code = $1 AND {}",
            mode.predicate()
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(asset_code)
            .fetch_optional(executor)
            .await
    }

    /// Look up an asset by the scan code printed on its label.
    pub async fn find_by_qr_code<'e, E>(
        executor: E,
        qr_code: &str,
        mode: QueryMode,
    ) -> Result<Option<Asset>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM assets WHERE qr_code = $1 AND {}",
            mode.predicate()
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(qr_code)
            .fetch_optional(executor)
            .await
    }

    /// List assets ordered by business key, optionally narrowed to one office.
    pub async fn list<'e, E>(
        executor: E,
        office_id: Option<DbId>,
        mode: QueryMode,
    ) -> Result<Vec<Asset>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM assets
             WHERE ($1::BIGINT IS NULL OR office_id = $1) AND {}
             ORDER BY asset_code",
            mode.predicate()
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(office_id)
            .fetch_all(executor)
            .await
    }

    /// Count active assets referencing a catalog item.
    pub async fn count_active_by_catalog_item<'e, E>(
        executor: E,
        catalog_item_id: DbId,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM assets WHERE catalog_item_id = $1 AND deleted_at IS NULL",
        )
        .bind(catalog_item_id)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    /// Count active assets located in an office.
    pub async fn count_active_by_office<'e, E>(
        executor: E,
        office_id: DbId,
    ) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM assets WHERE office_id = $1 AND deleted_at IS NULL")
                .bind(office_id)
                .fetch_one(executor)
                .await?;
        Ok(row.0)
    }

    /// Active assets per condition code, ordered by code.
    pub async fn count_by_condition<'e, E>(executor: E) -> Result<Vec<(String, i64)>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as(
            "SELECT condition, COUNT(*) FROM assets WHERE deleted_at IS NULL \
             GROUP BY condition ORDER BY condition",
        )
        .fetch_all(executor)
        .await
    }

    /// Update an active asset. Only non-`None` fields in `input` are applied.
    pub async fn update<'e, E>(
        executor: E,
        id: DbId,
        input: &UpdateAsset,
        updated_by: Option<DbId>,
    ) -> Result<Option<Asset>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE assets SET
                asset_code = COALESCE($2, asset_code),
                internal_code = COALESCE($3, internal_code),
                catalog_item_id = COALESCE($4, catalog_item_id),
                office_id = COALESCE($5, office_id),
                condition = COALESCE($6, condition),
                brand = COALESCE($7, brand),
                model = COALESCE($8, model),
                color = COALESCE($9, color),
                serial = COALESCE($10, serial),
                dimensions = COALESCE($11, dimensions),
                plate = COALESCE($12, plate),
                observations = COALESCE($13, observations),
                updated_by = $14
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .bind(&input.asset_code)
            .bind(&input.internal_code)
            .bind(input.catalog_item_id)
            .bind(input.office_id)
            .bind(&input.condition)
            .bind(&input.brand)
            .bind(&input.model)
            .bind(&input.color)
            .bind(&input.serial)
            .bind(&input.dimensions)
            .bind(&input.plate)
            .bind(&input.observations)
            .bind(updated_by)
            .fetch_optional(executor)
            .await
    }

    /// Move an active asset to another office (movement confirmation).
    pub async fn set_office<'e, E>(
        executor: E,
        id: DbId,
        office_id: DbId,
        updated_by: Option<DbId>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE assets SET office_id = $2, updated_by = $3 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(office_id)
        .bind(updated_by)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
