//! Asset condition history model and DTOs.

use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `status_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusHistory {
    pub id: DbId,
    pub asset_id: DbId,
    pub previous_condition: String,
    pub new_condition: String,
    pub observations: String,
    pub changed_by: Option<DbId>,
    pub gps_location: Option<String>,
    pub changed_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub deletion_reason: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a condition change.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStatusHistory {
    pub asset_id: DbId,
    pub previous_condition: String,
    pub new_condition: String,
    pub observations: Option<String>,
    pub changed_by: Option<DbId>,
    pub gps_location: Option<String>,
}
