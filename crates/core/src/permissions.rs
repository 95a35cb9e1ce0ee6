//! Role-to-capability mapping for the recycle bin and record editing.
//!
//! Every check goes through a [`Principal`], which carries the active flag
//! alongside the role: a deactivated account holds no capabilities at all.
//! Ledger reads resolve an explicit [`LedgerScope`]; asking for a scope the
//! principal cannot hold is a denial, never a silent narrowing.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

/// A single permission the layers above may ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewOwnEntries,
    ViewAllEntries,
    RestoreOwn,
    RestoreOthers,
    BulkRestore,
    PermanentDelete,
    ViewAuditLogs,
    ManageRetention,
    /// Create, update and soft-delete registry records.
    EditRecords,
    /// Submit offline changes and resolve their conflicts.
    MobileSync,
}

const ADMINISTRATOR_CAPABILITIES: &[Capability] = &[
    Capability::ViewOwnEntries,
    Capability::ViewAllEntries,
    Capability::RestoreOwn,
    Capability::RestoreOthers,
    Capability::BulkRestore,
    Capability::PermanentDelete,
    Capability::ViewAuditLogs,
    Capability::ManageRetention,
    Capability::EditRecords,
    Capability::MobileSync,
];

const STAFF_CAPABILITIES: &[Capability] = &[
    Capability::ViewOwnEntries,
    Capability::RestoreOwn,
    Capability::BulkRestore,
    Capability::EditRecords,
    Capability::MobileSync,
];

const AUDITOR_CAPABILITIES: &[Capability] = &[
    Capability::ViewOwnEntries,
    Capability::ViewAllEntries,
    Capability::ViewAuditLogs,
];

/// Capabilities granted to an active user holding `role`.
pub fn capabilities_for(role: Role) -> &'static [Capability] {
    match role {
        Role::Administrator => ADMINISTRATOR_CAPABILITIES,
        Role::Staff => STAFF_CAPABILITIES,
        Role::Auditor => AUDITOR_CAPABILITIES,
        Role::ReadOnly => &[],
    }
}

/// The authenticated caller as seen by the permission layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: DbId,
    pub role: Role,
    pub is_active: bool,
}

impl Principal {
    pub fn new(user_id: DbId, role: Role, is_active: bool) -> Self {
        Self {
            user_id,
            role,
            is_active,
        }
    }

    /// Whether this principal currently holds `capability`.
    pub fn can(&self, capability: Capability) -> bool {
        self.is_active && capabilities_for(self.role).contains(&capability)
    }

    /// Like [`can`](Self::can) but returns a `Forbidden` error on denial.
    pub fn require(&self, capability: Capability) -> Result<(), CoreError> {
        if self.can(capability) {
            Ok(())
        } else if !self.is_active {
            Err(CoreError::Forbidden("User account is deactivated".into()))
        } else {
            Err(CoreError::Forbidden(format!(
                "Role '{}' lacks the {capability:?} capability",
                self.role
            )))
        }
    }

    /// The ledger scope used when the caller does not ask for one.
    pub fn default_scope(&self) -> LedgerScope {
        if self.can(Capability::ViewAllEntries) {
            LedgerScope::All
        } else {
            LedgerScope::Own
        }
    }

    /// Resolve the scope for a ledger read.
    ///
    /// `None` picks [`default_scope`](Self::default_scope). Requesting
    /// [`LedgerScope::All`] without `ViewAllEntries` is denied.
    pub fn resolve_scope(&self, requested: Option<LedgerScope>) -> Result<LedgerScope, CoreError> {
        self.require(Capability::ViewOwnEntries)?;
        let scope = requested.unwrap_or_else(|| self.default_scope());
        if scope == LedgerScope::All {
            self.require(Capability::ViewAllEntries)?;
        }
        Ok(scope)
    }

    /// The `deleted_by` filter a resolved scope implies.
    pub fn owner_filter(&self, scope: LedgerScope) -> Option<DbId> {
        match scope {
            LedgerScope::Own => Some(self.user_id),
            LedgerScope::All => None,
        }
    }

    /// Check that this principal may restore an entry deleted by `deleted_by`.
    pub fn check_restore(&self, deleted_by: Option<DbId>) -> Result<(), CoreError> {
        if deleted_by == Some(self.user_id) {
            self.require(Capability::RestoreOwn)
        } else {
            self.require(Capability::RestoreOthers)
        }
    }

    /// Check that this principal may view an entry deleted by `deleted_by`.
    pub fn check_view(&self, deleted_by: Option<DbId>) -> Result<(), CoreError> {
        if deleted_by == Some(self.user_id) {
            self.require(Capability::ViewOwnEntries)
        } else {
            self.require(Capability::ViewAllEntries)
        }
    }
}

/// Which ledger entries a read covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerScope {
    /// Only entries the caller deleted.
    Own,
    /// Entries deleted by any user.
    All,
}

impl LedgerScope {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "own" => Ok(LedgerScope::Own),
            "all" => Ok(LedgerScope::All),
            other => Err(format!("Invalid scope '{other}'. Must be one of: own, all")),
        }
    }
}
