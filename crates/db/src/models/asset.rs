//! Asset model and DTOs.

use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub asset_code: String,
    pub internal_code: String,
    pub catalog_item_id: DbId,
    pub office_id: DbId,
    pub condition: String,
    pub brand: String,
    pub model: String,
    pub color: String,
    pub serial: String,
    pub dimensions: String,
    pub plate: String,
    pub observations: String,
    pub qr_code: String,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub deletion_reason: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Asset {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// DTO for creating an asset.
///
/// `qr_code` is generated when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAsset {
    pub asset_code: String,
    pub internal_code: Option<String>,
    pub catalog_item_id: DbId,
    pub office_id: DbId,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub serial: Option<String>,
    pub dimensions: Option<String>,
    pub plate: Option<String>,
    pub observations: Option<String>,
    pub qr_code: Option<String>,
}

/// DTO for updating an asset. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAsset {
    pub asset_code: Option<String>,
    pub internal_code: Option<String>,
    pub catalog_item_id: Option<DbId>,
    pub office_id: Option<DbId>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub serial: Option<String>,
    pub dimensions: Option<String>,
    pub plate: Option<String>,
    pub observations: Option<String>,
}
