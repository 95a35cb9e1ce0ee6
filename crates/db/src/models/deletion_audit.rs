//! Deletion audit log model and DTOs.

use patrimonio_core::entity::EntityKind;
use patrimonio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `deletion_audit_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeletionAuditLog {
    pub id: DbId,
    pub action: String,
    pub entity_kind: String,
    pub object_id: DbId,
    pub object_repr: String,
    pub module_name: String,
    pub user_id: Option<DbId>,
    pub reason: String,
    pub snapshot: serde_json::Value,
    pub recycle_bin_entry_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for writing one audit row. `user_id` is `None` for scheduler actions.
#[derive(Debug, Clone)]
pub struct CreateDeletionAuditLog {
    pub action: &'static str,
    pub entity_kind: EntityKind,
    pub object_id: DbId,
    pub object_repr: String,
    pub user_id: Option<DbId>,
    pub reason: String,
    pub snapshot: serde_json::Value,
    pub recycle_bin_entry_id: Option<DbId>,
}

/// Filters for audit listings.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub action: Option<String>,
    pub module_name: Option<String>,
    pub user_id: Option<DbId>,
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
