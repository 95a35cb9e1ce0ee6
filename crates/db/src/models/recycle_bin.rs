//! Recycle-bin ledger model and DTOs.

use patrimonio_core::entity::EntityKind;
use patrimonio_core::recycle_bin::{EntryState, StateFilter};
use patrimonio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `recycle_bin_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecycleBinEntry {
    pub id: DbId,
    pub entity_kind: String,
    pub object_id: DbId,
    pub object_repr: String,
    pub module_name: String,
    pub deleted_by: Option<DbId>,
    pub deletion_reason: String,
    pub deleted_at: Timestamp,
    pub auto_delete_at: Timestamp,
    pub restored_at: Option<Timestamp>,
    pub restored_by: Option<DbId>,
    pub created_at: Timestamp,
}

impl RecycleBinEntry {
    pub fn state(&self) -> EntryState {
        EntryState::of(self.restored_at)
    }

    /// Parse the stored kind tag.
    pub fn kind(&self) -> Result<EntityKind, String> {
        EntityKind::parse(&self.entity_kind)
    }
}

/// DTO for inserting a ledger entry at soft-delete time.
#[derive(Debug, Clone)]
pub struct CreateRecycleBinEntry {
    pub entity_kind: EntityKind,
    pub object_id: DbId,
    pub object_repr: String,
    pub deleted_by: Option<DbId>,
    pub deletion_reason: String,
    pub deleted_at: Timestamp,
    pub auto_delete_at: Timestamp,
}

/// Filters for ledger listings. `deleted_by` carries the ownership scope.
#[derive(Debug, Clone, Default)]
pub struct RecycleBinFilter {
    pub deleted_by: Option<DbId>,
    pub module_name: Option<String>,
    pub entity_kind: Option<EntityKind>,
    pub state: StateFilter,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Pending entries per module.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModuleCount {
    pub module_name: String,
    pub count: i64,
}

/// Aggregates for the recycle-bin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RecycleBinStats {
    pub pending_total: i64,
    pub restored_total: i64,
    pub expiring_soon: i64,
    pub by_module: Vec<ModuleCount>,
}
