//! Repository for the `offices` table.

use patrimonio_core::entity::QueryMode;
use patrimonio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::office::{CreateOffice, Office, UpdateOffice};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, code, name, description, responsible, position, phone, email, \
    location, is_active, created_by, updated_by, deleted_at, deleted_by, deletion_reason, \
    created_at, updated_at";

/// Provides CRUD operations for offices.
pub struct OfficeRepo;

impl OfficeRepo {
    /// Insert a new office. Inputs are expected to be normalised already.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateOffice,
        created_by: Option<DbId>,
    ) -> Result<Office, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO offices
                (code, name, description, responsible, position, phone, email, location,
                 created_by, updated_by)
             VALUES ($1, $2, COALESCE($3, ''), $4, COALESCE($5, ''), COALESCE($6, ''),
                     COALESCE($7, ''), COALESCE($8, ''), $9, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Office>(&query)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.responsible)
            .bind(&input.position)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(&input.location)
            .bind(created_by)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        id: DbId,
        mode: QueryMode,
    ) -> Result<Option<Office>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM offices WHERE id = $1 AND {}",
            mode.predicate()
        );
        sqlx::query_as::<_, Office>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Read an office, deleted or not, holding a `FOR SHARE` lock until the
    /// transaction ends. Soft deletion takes `FOR UPDATE` on the same row.
    pub async fn lock_shared<'e, E>(executor: E, id: DbId) -> Result<Option<Office>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM offices WHERE id = $1 FOR SHARE");
        sqlx::query_as::<_, Office>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_code<'e, E>(
        executor: E,
        code: &str,
        mode: QueryMode,
    ) -> Result<Option<Office>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM offices WHERE code = $1 AND {}",
            mode.predicate()
        );
        sqlx::query_as::<_, Office>(&query)
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    /// List offices ordered by code.
    pub async fn list<'e, E>(executor: E, mode: QueryMode) -> Result<Vec<Office>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM offices WHERE {} ORDER BY code",
            mode.predicate()
        );
        sqlx::query_as::<_, Office>(&query).fetch_all(executor).await
    }

    pub async fn count<'e, E>(executor: E, mode: QueryMode) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT COUNT(*) FROM offices WHERE {}", mode.predicate());
        let row: (i64,) = sqlx::query_as(&query).fetch_one(executor).await?;
        Ok(row.0)
    }

    /// Update an active office. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no active row with the given `id` exists.
    pub async fn update<'e, E>(
        executor: E,
        id: DbId,
        input: &UpdateOffice,
        updated_by: Option<DbId>,
    ) -> Result<Option<Office>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "UPDATE offices SET
                code = COALESCE($2, code),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                responsible = COALESCE($5, responsible),
                position = COALESCE($6, position),
                phone = COALESCE($7, phone),
                email = COALESCE($8, email),
                location = COALESCE($9, location),
                is_active = COALESCE($10, is_active),
                updated_by = $11
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Office>(&query)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.responsible)
            .bind(&input.position)
            .bind(&input.phone)
            .bind(&input.email)
            .bind(&input.location)
            .bind(input.is_active)
            .bind(updated_by)
            .fetch_optional(executor)
            .await
    }
}
