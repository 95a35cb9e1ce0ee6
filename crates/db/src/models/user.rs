//! User model and DTOs.

use patrimonio_core::permissions::Principal;
use patrimonio_core::roles::Role;
use patrimonio_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// Build the permission-layer view of this user.
    pub fn principal(&self) -> Result<Principal, String> {
        let role = Role::parse(&self.role)?;
        Ok(Principal::new(self.id, role, self.is_active))
    }
}

/// DTO for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
}
