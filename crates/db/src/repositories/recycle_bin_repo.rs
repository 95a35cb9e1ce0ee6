//! Repository for the `recycle_bin_entries` ledger.

use patrimonio_core::entity::EntityKind;
use patrimonio_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::recycle_bin::{
    CreateRecycleBinEntry, ModuleCount, RecycleBinEntry, RecycleBinFilter, RecycleBinStats,
};

const COLUMNS: &str = "id, entity_kind, object_id, object_repr, module_name, deleted_by, \
    deletion_reason, deleted_at, auto_delete_at, restored_at, restored_by, created_at";

/// Default page size for ledger listings.
const DEFAULT_LIMIT: i64 = 100;

/// Shared `WHERE` clause for filtered listings and counts. `$1..$4` are the
/// filter fields in [`RecycleBinFilter`] order.
fn filter_clause(filter: &RecycleBinFilter) -> String {
    format!(
        "($1::BIGINT IS NULL OR deleted_by = $1) \
         AND ($2::TEXT IS NULL OR module_name = $2) \
         AND ($3::TEXT IS NULL OR entity_kind = $3) \
         AND ($4::TEXT IS NULL OR object_repr ILIKE '%' || $4 || '%' \
              OR deletion_reason ILIKE '%' || $4 || '%') \
         AND {}",
        filter.state.predicate()
    )
}

/// Provides ledger reads and state transitions.
pub struct RecycleBinRepo;

impl RecycleBinRepo {
    // ── Creation ──────────────────────────────────────────────────────

    /// Insert a pending entry. The module is derived from the entity kind.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateRecycleBinEntry,
    ) -> Result<RecycleBinEntry, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO recycle_bin_entries
                (entity_kind, object_id, object_repr, module_name, deleted_by,
                 deletion_reason, deleted_at, auto_delete_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RecycleBinEntry>(&query)
            .bind(input.entity_kind.as_str())
            .bind(input.object_id)
            .bind(&input.object_repr)
            .bind(input.entity_kind.module_name())
            .bind(input.deleted_by)
            .bind(&input.deletion_reason)
            .bind(input.deleted_at)
            .bind(input.auto_delete_at)
            .fetch_one(executor)
            .await
    }

    // ── Lookups ───────────────────────────────────────────────────────

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<RecycleBinEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM recycle_bin_entries WHERE id = $1");
        sqlx::query_as::<_, RecycleBinEntry>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lock an entry row until the enclosing transaction ends.
    pub async fn lock_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<RecycleBinEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM recycle_bin_entries WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, RecycleBinEntry>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// The pending entry for an object, locked.
    pub async fn lock_pending_for<'e, E>(
        executor: E,
        kind: EntityKind,
        object_id: DbId,
    ) -> Result<Option<RecycleBinEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM recycle_bin_entries
             WHERE entity_kind = $1 AND object_id = $2 AND restored_at IS NULL
             FOR UPDATE"
        );
        sqlx::query_as::<_, RecycleBinEntry>(&query)
            .bind(kind.as_str())
            .bind(object_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_pending_for<'e, E>(
        executor: E,
        kind: EntityKind,
        object_id: DbId,
    ) -> Result<Option<RecycleBinEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM recycle_bin_entries
             WHERE entity_kind = $1 AND object_id = $2 AND restored_at IS NULL"
        );
        sqlx::query_as::<_, RecycleBinEntry>(&query)
            .bind(kind.as_str())
            .bind(object_id)
            .fetch_optional(executor)
            .await
    }

    // ── Listing ───────────────────────────────────────────────────────

    /// List entries matching `filter`, most recently deleted first.
    pub async fn list<'e, E>(
        executor: E,
        filter: &RecycleBinFilter,
    ) -> Result<Vec<RecycleBinEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM recycle_bin_entries WHERE {} \
             ORDER BY deleted_at DESC, id DESC LIMIT $5 OFFSET $6",
            filter_clause(filter)
        );
        sqlx::query_as::<_, RecycleBinEntry>(&query)
            .bind(filter.deleted_by)
            .bind(&filter.module_name)
            .bind(filter.entity_kind.map(|k| k.as_str()))
            .bind(&filter.search)
            .bind(filter.limit.unwrap_or(DEFAULT_LIMIT))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(executor)
            .await
    }

    /// Count entries matching `filter`, ignoring pagination.
    pub async fn count<'e, E>(executor: E, filter: &RecycleBinFilter) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT COUNT(*) FROM recycle_bin_entries WHERE {}",
            filter_clause(filter)
        );
        let row: (i64,) = sqlx::query_as(&query)
            .bind(filter.deleted_by)
            .bind(&filter.module_name)
            .bind(filter.entity_kind.map(|k| k.as_str()))
            .bind(&filter.search)
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }

    // ── Scheduler selections ──────────────────────────────────────────

    /// Ids of pending entries of `module_name` whose deadline has passed.
    pub async fn expired_ids<'e, E>(
        executor: E,
        module_name: &str,
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM recycle_bin_entries \
             WHERE module_name = $1 AND restored_at IS NULL AND auto_delete_at <= $2 \
             ORDER BY auto_delete_at, id",
        )
        .bind(module_name)
        .bind(now)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Pending entries of `module_name` with `after < auto_delete_at <= until`.
    pub async fn list_pending_due_between<'e, E>(
        executor: E,
        module_name: &str,
        after: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<RecycleBinEntry>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM recycle_bin_entries
             WHERE module_name = $1 AND restored_at IS NULL
               AND auto_delete_at > $2 AND auto_delete_at <= $3
             ORDER BY auto_delete_at, id"
        );
        sqlx::query_as::<_, RecycleBinEntry>(&query)
            .bind(module_name)
            .bind(after)
            .bind(until)
            .fetch_all(executor)
            .await
    }

    // ── Transitions ───────────────────────────────────────────────────

    /// Move a pending entry to RESTORED.
    ///
    /// Guarded on `restored_at IS NULL`, so of two concurrent restores only
    /// one sees `true`.
    pub async fn mark_restored<'e, E>(
        executor: E,
        id: DbId,
        restored_by: DbId,
        restored_at: Timestamp,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE recycle_bin_entries SET restored_at = $2, restored_by = $3 \
             WHERE id = $1 AND restored_at IS NULL",
        )
        .bind(id)
        .bind(restored_at)
        .bind(restored_by)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove an entry (the PURGED transition). Returns `true` if removed.
    pub async fn delete<'e, E>(executor: E, id: DbId) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM recycle_bin_entries WHERE id = $1 AND restored_at IS NULL")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Statistics ────────────────────────────────────────────────────

    /// Dashboard aggregates, scoped to `deleted_by` when given.
    pub async fn stats(
        pool: &PgPool,
        deleted_by: Option<DbId>,
        expiring_before: Timestamp,
    ) -> Result<RecycleBinStats, sqlx::Error> {
        let totals: (i64, i64, i64) = sqlx::query_as(
            "SELECT \
                COUNT(*) FILTER (WHERE restored_at IS NULL), \
                COUNT(*) FILTER (WHERE restored_at IS NOT NULL), \
                COUNT(*) FILTER (WHERE restored_at IS NULL AND auto_delete_at <= $2) \
             FROM recycle_bin_entries \
             WHERE ($1::BIGINT IS NULL OR deleted_by = $1)",
        )
        .bind(deleted_by)
        .bind(expiring_before)
        .fetch_one(pool)
        .await?;

        let by_module = sqlx::query_as::<_, ModuleCount>(
            "SELECT module_name, COUNT(*) AS count FROM recycle_bin_entries \
             WHERE restored_at IS NULL AND ($1::BIGINT IS NULL OR deleted_by = $1) \
             GROUP BY module_name ORDER BY module_name",
        )
        .bind(deleted_by)
        .fetch_all(pool)
        .await?;

        Ok(RecycleBinStats {
            pending_total: totals.0,
            restored_total: totals.1,
            expiring_soon: totals.2,
            by_module,
        })
    }
}
