//! Repository for the `catalog_items` table.

use patrimonio_core::entity::QueryMode;
use patrimonio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::catalog::{CatalogItem, CreateCatalogItem, UpdateCatalogItem};

const COLUMNS: &str = "id, code, denomination, group_name, class_name, resolution, status, \
    created_by, updated_by, deleted_at, deleted_by, deletion_reason, created_at, updated_at";

/// Provides CRUD operations for catalog items.
pub struct CatalogItemRepo;

impl CatalogItemRepo {
    /// Insert a new catalog item. `status` defaults to `active`.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateCatalogItem,
        created_by: Option<DbId>,
    ) -> Result<CatalogItem, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO catalog_items
                (code, denomination, group_name, class_name, resolution, status,
                 created_by, updated_by)
             VALUES ($1, $2, COALESCE($3, ''), COALESCE($4, ''), COALESCE($5, ''),
                     COALESCE($6, 'active'), $7, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(&input.code)
            .bind(&input.denomination)
            .bind(&input.group_name)
            .bind(&input.class_name)
            .bind(&input.resolution)
            .bind(&input.status)
            .bind(created_by)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        id: DbId,
        mode: QueryMode,
    ) -> Result<Option<CatalogItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM catalog_items WHERE id = $1 AND {}",
            mode.predicate()
        );
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Read a catalog item, deleted or not, under a `FOR SHARE` lock.
    pub async fn lock_shared<'e, E>(
        executor: E,
        id: DbId,
    ) -> Result<Option<CatalogItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM catalog_items WHERE id = $1 FOR SHARE");
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List catalog items ordered by code.
    pub async fn list<'e, E>(executor: E, mode: QueryMode) -> Result<Vec<CatalogItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM catalog_items WHERE {} ORDER BY code",
            mode.predicate()
        );
        sqlx::query_as::<_, CatalogItem>(&query)
            .fetch_all(executor)
            .await
    }

    /// Update an active catalog item. Only non-`None` fields are applied.
    pub async fn update<'e, E>(
        executor: E,
        id: DbId,
        input: &UpdateCatalogItem,
        updated_by: Option<DbId>,
    ) -> Result<Option<CatalogItem>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE catalog_items SET
                code = COALESCE($2, code),
                denomination = COALESCE($3, denomination),
                group_name = COALESCE($4, group_name),
                class_name = COALESCE($5, class_name),
                resolution = COALESCE($6, resolution),
                status = COALESCE($7, status),
                updated_by = $8
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(&input.denomination)
            .bind(&input.group_name)
            .bind(&input.class_name)
            .bind(&input.resolution)
            .bind(&input.status)
            .bind(updated_by)
            .fetch_optional(executor)
            .await
    }
}
