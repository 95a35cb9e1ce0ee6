//! Soft-deletable entity kinds and the query modes every repository exposes.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Module names
// ---------------------------------------------------------------------------

/// Logical grouping used by retention configuration and the ledger.
pub const MODULE_OFFICES: &str = "offices";
pub const MODULE_CATALOG: &str = "catalog";
pub const MODULE_ASSETS: &str = "assets";

/// All valid module names.
pub const VALID_MODULES: &[&str] = &[MODULE_OFFICES, MODULE_CATALOG, MODULE_ASSETS];

/// Validate a module name against [`VALID_MODULES`].
pub fn validate_module(module: &str) -> Result<(), String> {
    if VALID_MODULES.contains(&module) {
        Ok(())
    } else {
        Err(format!(
            "Invalid module '{module}'. Must be one of: {}",
            VALID_MODULES.join(", ")
        ))
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The tag half of the ledger's polymorphic reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Office,
    CatalogItem,
    Asset,
    Movement,
    StatusHistory,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Office,
        EntityKind::CatalogItem,
        EntityKind::Asset,
        EntityKind::Movement,
        EntityKind::StatusHistory,
    ];

    /// Stored tag, matching `ck_recycle_bin_entries_kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Office => "office",
            EntityKind::CatalogItem => "catalog_item",
            EntityKind::Asset => "asset",
            EntityKind::Movement => "movement",
            EntityKind::StatusHistory => "status_history",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == value)
            .ok_or_else(|| format!("Unknown entity kind: {value}"))
    }

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Office => "offices",
            EntityKind::CatalogItem => "catalog_items",
            EntityKind::Asset => "assets",
            EntityKind::Movement => "movements",
            EntityKind::StatusHistory => "status_history",
        }
    }

    /// Retention module this kind belongs to. Asset children share the
    /// asset module's retention window.
    pub fn module_name(self) -> &'static str {
        match self {
            EntityKind::Office => MODULE_OFFICES,
            EntityKind::CatalogItem => MODULE_CATALOG,
            EntityKind::Asset | EntityKind::Movement | EntityKind::StatusHistory => MODULE_ASSETS,
        }
    }

    /// Human-readable label for error messages and notifications.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Office => "Office",
            EntityKind::CatalogItem => "CatalogItem",
            EntityKind::Asset => "Asset",
            EntityKind::Movement => "Movement",
            EntityKind::StatusHistory => "StatusHistory",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{kind, id}` pair pointing at one soft-deletable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: DbId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: DbId) -> Self {
        Self { kind, id }
    }
}

// ---------------------------------------------------------------------------
// QueryMode
// ---------------------------------------------------------------------------

/// Visibility of soft-deleted rows in a read.
///
/// Repositories never pick a mode on their own: every list, find and count
/// takes one. [`QueryMode::default`] is `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Only rows with `deleted_at IS NULL`.
    #[default]
    Active,
    /// Only rows with `deleted_at IS NOT NULL`.
    DeletedOnly,
    /// Both.
    All,
}

impl QueryMode {
    /// SQL predicate over an unqualified `deleted_at` column.
    pub fn predicate(self) -> &'static str {
        match self {
            QueryMode::Active => "deleted_at IS NULL",
            QueryMode::DeletedOnly => "deleted_at IS NOT NULL",
            QueryMode::All => "TRUE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "active" => Ok(QueryMode::Active),
            "deleted" | "deleted_only" => Ok(QueryMode::DeletedOnly),
            "all" => Ok(QueryMode::All),
            other => Err(format!(
                "Invalid mode '{other}'. Must be one of: active, deleted, all"
            )),
        }
    }
}
