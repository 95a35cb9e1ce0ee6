//! Repository for the `deletion_audit_logs` table.

use patrimonio_core::entity::EntityKind;
use patrimonio_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::deletion_audit::{AuditLogFilter, CreateDeletionAuditLog, DeletionAuditLog};

const COLUMNS: &str = "id, action, entity_kind, object_id, object_repr, module_name, user_id, \
    reason, snapshot, recycle_bin_entry_id, created_at";

const DEFAULT_LIMIT: i64 = 100;

/// Append-only access to the deletion audit trail.
pub struct DeletionAuditRepo;

impl DeletionAuditRepo {
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateDeletionAuditLog,
    ) -> Result<DeletionAuditLog, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO deletion_audit_logs
                (action, entity_kind, object_id, object_repr, module_name, user_id, reason,
                 snapshot, recycle_bin_entry_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeletionAuditLog>(&query)
            .bind(input.action)
            .bind(input.entity_kind.as_str())
            .bind(input.object_id)
            .bind(&input.object_repr)
            .bind(input.entity_kind.module_name())
            .bind(input.user_id)
            .bind(&input.reason)
            .bind(&input.snapshot)
            .bind(input.recycle_bin_entry_id)
            .fetch_one(executor)
            .await
    }

    /// Filtered listing, newest first.
    pub async fn list<'e, E>(
        executor: E,
        filter: &AuditLogFilter,
    ) -> Result<Vec<DeletionAuditLog>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM deletion_audit_logs
             WHERE ($1::TEXT IS NULL OR action = $1)
               AND ($2::TEXT IS NULL OR module_name = $2)
               AND ($3::BIGINT IS NULL OR user_id = $3)
               AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4)
               AND ($5::TIMESTAMPTZ IS NULL OR created_at < $5)
             ORDER BY created_at DESC, id DESC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, DeletionAuditLog>(&query)
            .bind(&filter.action)
            .bind(&filter.module_name)
            .bind(filter.user_id)
            .bind(filter.since)
            .bind(filter.until)
            .bind(filter.limit.unwrap_or(DEFAULT_LIMIT))
            .bind(filter.offset.unwrap_or(0))
            .fetch_all(executor)
            .await
    }

    /// Full trail of one object, oldest first.
    pub async fn list_for_object<'e, E>(
        executor: E,
        kind: EntityKind,
        object_id: DbId,
    ) -> Result<Vec<DeletionAuditLog>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM deletion_audit_logs
             WHERE entity_kind = $1 AND object_id = $2
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, DeletionAuditLog>(&query)
            .bind(kind.as_str())
            .bind(object_id)
            .fetch_all(executor)
            .await
    }
}
