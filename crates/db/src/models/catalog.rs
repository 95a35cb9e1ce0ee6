//! Catalog item model and DTOs.

use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `catalog_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CatalogItem {
    pub id: DbId,
    pub code: String,
    pub denomination: String,
    pub group_name: String,
    pub class_name: String,
    pub resolution: String,
    pub status: String,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub deletion_reason: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CatalogItem {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// DTO for creating a catalog item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCatalogItem {
    pub code: String,
    pub denomination: String,
    pub group_name: Option<String>,
    pub class_name: Option<String>,
    pub resolution: Option<String>,
    /// Defaults to `active` if omitted.
    pub status: Option<String>,
}

/// DTO for updating a catalog item. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCatalogItem {
    pub code: Option<String>,
    pub denomination: Option<String>,
    pub group_name: Option<String>,
    pub class_name: Option<String>,
    pub resolution: Option<String>,
    pub status: Option<String>,
}
