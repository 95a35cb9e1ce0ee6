//! Well-known role name constants.
//!
//! These must match the `ck_users_role` constraint in
//! `20261001000002_create_users_table.sql`.

use serde::{Deserialize, Serialize};

pub const ROLE_ADMINISTRATOR: &str = "administrator";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_AUDITOR: &str = "auditor";
pub const ROLE_READ_ONLY: &str = "read_only";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMINISTRATOR, ROLE_STAFF, ROLE_AUDITOR, ROLE_READ_ONLY];

/// A user's role in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Staff,
    Auditor,
    ReadOnly,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Administrator => ROLE_ADMINISTRATOR,
            Role::Staff => ROLE_STAFF,
            Role::Auditor => ROLE_AUDITOR,
            Role::ReadOnly => ROLE_READ_ONLY,
        }
    }

    /// Parse a stored role name. Unknown names are rejected rather than
    /// mapped to a default role.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            ROLE_ADMINISTRATOR => Ok(Role::Administrator),
            ROLE_STAFF => Ok(Role::Staff),
            ROLE_AUDITOR => Ok(Role::Auditor),
            ROLE_READ_ONLY => Ok(Role::ReadOnly),
            other => Err(format!(
                "Invalid role '{other}'. Must be one of: {}",
                VALID_ROLES.join(", ")
            )),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
