//! Mobile sync models: sessions, offline changes and conflicts.

use patrimonio_core::sync::{ChangeType, ConflictKind, SyncState};
use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `sync_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SyncSession {
    pub id: DbId,
    pub user_id: DbId,
    pub device_id: String,
    pub total_changes: i32,
    pub processed_changes: i32,
    pub succeeded_changes: i32,
    pub failed_changes: i32,
    pub conflict_changes: i32,
    pub is_complete: bool,
    pub result_message: String,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Final tallies written when a session finishes replaying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionTally {
    pub processed: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub conflicted: i32,
}

/// A row from the `offline_changes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OfflineChange {
    pub id: DbId,
    pub user_id: DbId,
    pub session_id: DbId,
    pub batch_position: i32,
    pub change_type: String,
    pub local_timestamp: Timestamp,
    pub target_identifier: String,
    pub scan_code: Option<String>,
    pub payload: serde_json::Value,
    pub sync_state: String,
    pub attempt_count: i32,
    pub last_attempt_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub device_id: String,
    pub gps_location: Option<String>,
    pub bypass_staleness: bool,
    pub applied_asset_id: Option<DbId>,
    pub applied_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OfflineChange {
    pub fn change_type(&self) -> Result<ChangeType, String> {
        ChangeType::parse(&self.change_type)
    }

    pub fn state(&self) -> Result<SyncState, String> {
        SyncState::parse(&self.sync_state)
    }
}

/// One mutation as submitted by a device.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedChange {
    pub change_type: ChangeType,
    pub local_timestamp: Timestamp,
    #[serde(default)]
    pub target_identifier: String,
    pub scan_code: Option<String>,
    #[serde(default = "empty_object")]
    pub payload: serde_json::Value,
    pub gps_location: Option<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// A row from the `sync_conflicts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SyncConflict {
    pub id: DbId,
    pub offline_change_id: DbId,
    pub conflict_kind: String,
    pub server_snapshot: serde_json::Value,
    pub client_payload: serde_json::Value,
    pub detail: String,
    pub resolution: Option<String>,
    pub resolved: bool,
    pub resolved_by: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for recording a conflict.
#[derive(Debug, Clone)]
pub struct CreateSyncConflict {
    pub offline_change_id: DbId,
    pub conflict_kind: ConflictKind,
    pub server_snapshot: serde_json::Value,
    pub client_payload: serde_json::Value,
    pub detail: String,
}
