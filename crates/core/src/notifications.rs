//! Notification kinds and priorities emitted by the registry.

use serde::{Deserialize, Serialize};

pub const KIND_RECYCLE_WARNING: &str = "recycle_warning";
pub const KIND_RECYCLE_FINAL_WARNING: &str = "recycle_final_warning";
pub const KIND_RECYCLE_RESTORED: &str = "recycle_restored";
pub const KIND_RECYCLE_PURGED: &str = "recycle_purged";
pub const KIND_SYNC_CONFLICT: &str = "sync_conflict";

/// Delivery priority, matching `ck_notifications_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}
