//! Movement (transfer between offices) model and DTOs.

use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `movements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Movement {
    pub id: DbId,
    pub asset_id: DbId,
    pub origin_office_id: DbId,
    pub destination_office_id: DbId,
    pub reason: String,
    pub observations: String,
    pub confirmed: bool,
    pub confirmed_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub deletion_reason: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a movement. The origin is the asset's current office.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovement {
    pub destination_office_id: DbId,
    pub reason: String,
    pub observations: Option<String>,
}
