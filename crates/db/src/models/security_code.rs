//! Security-code attempt model.

use patrimonio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `security_code_attempts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SecurityCodeAttempt {
    pub id: DbId,
    pub user_id: DbId,
    pub attempt_type: String,
    pub success: bool,
    pub recycle_bin_entry_ids: Vec<DbId>,
    pub created_at: Timestamp,
}
