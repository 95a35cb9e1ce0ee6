//! Per-module retention configuration model.

use patrimonio_core::retention::RetentionPolicy;
use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `retention_configs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RetentionConfig {
    pub module_name: String,
    pub retention_days: i32,
    pub auto_delete_enabled: bool,
    pub warning_days_before: i32,
    pub final_warning_days_before: i32,
    pub updated_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RetentionConfig {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            retention_days: self.retention_days,
            auto_delete_enabled: self.auto_delete_enabled,
            warning_days_before: self.warning_days_before,
            final_warning_days_before: self.final_warning_days_before,
        }
    }
}

/// DTO for updating a module's retention. All fields are optional; the
/// merged result is validated before it is written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRetentionConfig {
    pub retention_days: Option<i32>,
    pub auto_delete_enabled: Option<bool>,
    pub warning_days_before: Option<i32>,
    pub final_warning_days_before: Option<i32>,
}

impl UpdateRetentionConfig {
    /// Overlay this update onto `current`.
    pub fn apply(&self, current: RetentionPolicy) -> RetentionPolicy {
        RetentionPolicy {
            retention_days: self.retention_days.unwrap_or(current.retention_days),
            auto_delete_enabled: self
                .auto_delete_enabled
                .unwrap_or(current.auto_delete_enabled),
            warning_days_before: self
                .warning_days_before
                .unwrap_or(current.warning_days_before),
            final_warning_days_before: self
                .final_warning_days_before
                .unwrap_or(current.final_warning_days_before),
        }
    }
}
