//! Office model and DTOs.

use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `offices` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Office {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub responsible: String,
    pub position: String,
    pub phone: String,
    pub email: String,
    pub location: String,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub deleted_at: Option<Timestamp>,
    pub deleted_by: Option<DbId>,
    pub deletion_reason: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Office {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// DTO for creating an office. `code` is normalised before insert.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOffice {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub responsible: String,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
}

/// DTO for updating an office. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOffice {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub responsible: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}
