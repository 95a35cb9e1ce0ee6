//! Kind-dispatched soft-delete primitives shared by every entity table.
//!
//! The lifecycle engine works on `{kind, id}` pairs rather than typed rows,
//! so the mark/clear/purge statements live here once, parameterised by the
//! table behind each [`EntityKind`].

use patrimonio_core::entity::EntityKind;
use patrimonio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::PgExecutor;

/// Deletion columns of one row, plus the display string the ledger captures.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeletionTarget {
    pub id: DbId,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub object_repr: String,
}

impl DeletionTarget {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Map a kind to its display-string SQL expression.
fn repr_expr(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Office => "code || ' - ' || name",
        EntityKind::CatalogItem => "code || ' - ' || denomination",
        EntityKind::Asset => {
            "CASE WHEN brand = '' AND model = '' THEN asset_code \
             ELSE TRIM(asset_code || ' - ' || brand || ' ' || model) END"
        }
        EntityKind::Movement => "'Movement #' || id",
        EntityKind::StatusHistory => {
            "'Status change #' || id || ' (' || previous_condition || ' -> ' || new_condition || ')'"
        }
    }
}

/// Provides soft-delete operations that work for any [`EntityKind`].
pub struct SoftDeleteRepo;

impl SoftDeleteRepo {
    // ── Reads ─────────────────────────────────────────────────────────

    /// Load the deletion state of a row and lock it until the transaction ends.
    ///
    /// Sees active and deleted rows alike. Returns `None` if the row is gone.
    pub async fn lock_target<'e, E>(
        executor: E,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<DeletionTarget>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT id, deleted_at, deleted_by, {} AS object_repr \
             FROM {} WHERE id = $1 FOR UPDATE",
            repr_expr(kind),
            kind.table()
        );
        sqlx::query_as::<_, DeletionTarget>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Full row as JSON, for audit snapshots and sync conflict records.
    pub async fn snapshot<'e, E>(
        executor: E,
        kind: EntityKind,
        id: DbId,
    ) -> Result<Option<serde_json::Value>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT to_jsonb(t) FROM {} t WHERE t.id = $1", kind.table());
        let row: Option<(serde_json::Value,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(|r| r.0))
    }

    // ── Mutations ─────────────────────────────────────────────────────

    /// Stamp deletion metadata on an active row. Returns `false` if the row
    /// is missing or already deleted.
    pub async fn mark_deleted<'e, E>(
        executor: E,
        kind: EntityKind,
        id: DbId,
        deleted_by: Option<DbId>,
        reason: &str,
        deleted_at: Timestamp,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "UPDATE {} SET deleted_at = $2, deleted_by = $3, deletion_reason = $4 \
             WHERE id = $1 AND deleted_at IS NULL",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(deleted_at)
            .bind(deleted_by)
            .bind(reason)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear deletion metadata. Returns `false` if the row is missing or active.
    pub async fn clear_deleted<'e, E>(
        executor: E,
        kind: EntityKind,
        id: DbId,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "UPDATE {} SET deleted_at = NULL, deleted_by = NULL, deletion_reason = '' \
             WHERE id = $1 AND deleted_at IS NOT NULL",
            kind.table()
        );
        let result = sqlx::query(&sql).bind(id).execute(executor).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Physically remove a row. Returns `true` if a row was removed.
    ///
    /// No ledger bookkeeping happens here.
    pub async fn hard_delete<'e, E>(
        executor: E,
        kind: EntityKind,
        id: DbId,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(executor).await?;
        Ok(result.rows_affected() > 0)
    }
}
