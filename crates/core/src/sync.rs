//! Offline change state machine, conflict kinds and payload rules.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// ChangeType
// ---------------------------------------------------------------------------

/// Kind of mutation captured on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Update,
    StatusChange,
    AddPhoto,
    InventoryScan,
}

impl ChangeType {
    pub const ALL: [ChangeType; 5] = [
        ChangeType::Create,
        ChangeType::Update,
        ChangeType::StatusChange,
        ChangeType::AddPhoto,
        ChangeType::InventoryScan,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::StatusChange => "status_change",
            ChangeType::AddPhoto => "add_photo",
            ChangeType::InventoryScan => "inventory_scan",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        ChangeType::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| format!("Invalid change type '{value}'"))
    }

    /// Whether replay compares the target's `updated_at` with the device clock.
    pub fn checks_staleness(self) -> bool {
        matches!(self, ChangeType::Update | ChangeType::StatusChange)
    }
}

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// Replay state of one offline change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Processing,
    Completed,
    Error,
    Conflict,
}

impl SyncState {
    pub const ALL: [SyncState; 5] = [
        SyncState::Pending,
        SyncState::Processing,
        SyncState::Completed,
        SyncState::Error,
        SyncState::Conflict,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Processing => "processing",
            SyncState::Completed => "completed",
            SyncState::Error => "error",
            SyncState::Conflict => "conflict",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        SyncState::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| format!("Invalid sync state '{value}'"))
    }

    /// Allowed moves:
    ///
    /// ```text
    /// pending    -> processing
    /// processing -> completed | error | conflict
    /// error      -> pending            (explicit retry)
    /// conflict   -> pending | completed (resolution)
    /// ```
    pub fn can_transition(self, to: SyncState) -> bool {
        matches!(
            (self, to),
            (SyncState::Pending, SyncState::Processing)
                | (
                    SyncState::Processing,
                    SyncState::Completed | SyncState::Error | SyncState::Conflict
                )
                | (SyncState::Error, SyncState::Pending)
                | (SyncState::Conflict, SyncState::Pending | SyncState::Completed)
        )
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    TargetModified,
    TargetDeleted,
    DuplicateKey,
    InconsistentData,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::TargetModified => "target_modified",
            ConflictKind::TargetDeleted => "target_deleted",
            ConflictKind::DuplicateKey => "duplicate_key",
            ConflictKind::InconsistentData => "inconsistent_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    KeepServer,
    KeepClient,
    Manual,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::KeepServer => "keep_server",
            Resolution::KeepClient => "keep_client",
            Resolution::Manual => "manual",
        }
    }

    /// State the offline change moves to once this resolution is applied.
    pub fn next_state(self) -> SyncState {
        match self {
            Resolution::KeepServer => SyncState::Completed,
            Resolution::KeepClient | Resolution::Manual => SyncState::Pending,
        }
    }

    /// Whether the next replay skips the staleness check. The user chose
    /// these after seeing the server snapshot.
    pub fn bypasses_staleness(self) -> bool {
        matches!(self, Resolution::KeepClient | Resolution::Manual)
    }
}

// ---------------------------------------------------------------------------
// Payload rules
// ---------------------------------------------------------------------------

/// Fields a device may never overwrite.
pub const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "qr_code",
    "created_at",
    "updated_at",
    "created_by",
    "deleted_at",
    "deleted_by",
    "deletion_reason",
];

/// Drop protected keys from an update payload.
pub fn strip_protected_fields(
    payload: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    payload
        .iter()
        .filter(|(key, _)| !PROTECTED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Whether the server copy moved after the device captured its state.
///
/// `bypass` is set when the user chose to keep the client version of a
/// conflicting change.
pub fn is_stale(server_updated_at: Timestamp, local_timestamp: Timestamp, bypass: bool) -> bool {
    !bypass && server_updated_at > local_timestamp
}

// ---------------------------------------------------------------------------
// Submission limits
// ---------------------------------------------------------------------------

/// Changes captured longer ago than this are refused at submission.
pub const MAX_LOCAL_TIMESTAMP_AGE_DAYS: i64 = 30;

/// Upper bound on changes accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 500;

pub const MAX_DEVICE_ID_LEN: usize = 100;

/// Reject device clocks that are too old to replay meaningfully.
pub fn validate_local_timestamp(local: Timestamp, now: Timestamp) -> Result<(), String> {
    if local < now - chrono::Duration::days(MAX_LOCAL_TIMESTAMP_AGE_DAYS) {
        return Err(format!(
            "local_timestamp {local} is older than {MAX_LOCAL_TIMESTAMP_AGE_DAYS} days"
        ));
    }
    Ok(())
}

pub fn validate_device_id(device_id: &str) -> Result<(), String> {
    let trimmed = device_id.trim();
    if trimmed.is_empty() {
        return Err("device_id is required".to_string());
    }
    if trimmed.len() > MAX_DEVICE_ID_LEN {
        return Err(format!("device_id must be at most {MAX_DEVICE_ID_LEN} characters"));
    }
    Ok(())
}
