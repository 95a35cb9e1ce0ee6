//! Soft delete, restore, hard delete and the asset cascade.
//!
//! Every mutation runs in one transaction: stamping the entity, writing the
//! ledger entry and writing the audit row either all happen or none do.
//! Events are published only after commit.

use chrono::{SubsecRound, Utc};
use patrimonio_core::audit::{ACTION_RESTORE, ACTION_SOFT_DELETE};
use patrimonio_core::entity::{EntityKind, EntityRef};
use patrimonio_core::types::{DbId, Timestamp};
use patrimonio_db::models::deletion_audit::CreateDeletionAuditLog;
use patrimonio_db::models::recycle_bin::{CreateRecycleBinEntry, RecycleBinEntry};
use patrimonio_db::repositories::{
    AssetRepo, DeletionAuditRepo, MovementRepo, RecycleBinRepo, RetentionConfigRepo,
    SoftDeleteRepo, StatusHistoryRepo,
};
use patrimonio_db::DbPool;
use patrimonio_events::bus::{EVENT_RECORD_DELETED, EVENT_RECORD_RESTORED, EVENT_RECYCLE_RESTORED};
use patrimonio_events::{EventBus, PlatformEvent};
use serde::Serialize;
use sqlx::PgConnection;

use crate::error::LifecycleError;

/// Current time at database precision, so a stored `deleted_at` plus the
/// retention period equals the stored `auto_delete_at` exactly.
pub(crate) fn db_now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Everything a cascade soft-deleted, asset first.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeReport {
    pub asset_id: DbId,
    pub entries: Vec<RecycleBinEntry>,
}

impl CascadeReport {
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.entity_kind == kind.as_str())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Soft delete
// ---------------------------------------------------------------------------

/// Soft-delete one record and file it in the recycle bin.
pub async fn soft_delete(
    pool: &DbPool,
    events: &EventBus,
    target: EntityRef,
    user_id: DbId,
    reason: &str,
) -> Result<RecycleBinEntry, LifecycleError> {
    let mut tx = pool.begin().await?;
    let entry = soft_delete_in(&mut *tx, target, user_id, reason, db_now()).await?;
    tx.commit().await?;

    tracing::info!(
        entity_kind = %target.kind,
        entity_id = target.id,
        entry_id = entry.id,
        user_id,
        "Record soft-deleted"
    );
    events.publish(deleted_event(&entry, user_id));
    Ok(entry)
}

/// Soft-delete an asset together with its active movements and condition
/// history.
///
/// Refused while any active movement of the asset is unconfirmed; in that
/// case nothing changes.
pub async fn soft_delete_cascade(
    pool: &DbPool,
    events: &EventBus,
    asset_id: DbId,
    user_id: DbId,
    reason: &str,
) -> Result<CascadeReport, LifecycleError> {
    let mut tx = pool.begin().await?;

    let asset = SoftDeleteRepo::lock_target(&mut *tx, EntityKind::Asset, asset_id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: EntityKind::Asset.label(),
            id: asset_id,
        })?;
    if asset.is_deleted() {
        return Err(LifecycleError::AlreadyDeleted {
            entity: EntityKind::Asset.label(),
            id: asset_id,
        });
    }

    let movement_ids = MovementRepo::unconfirmed_ids(&mut *tx, asset_id).await?;
    if !movement_ids.is_empty() {
        return Err(LifecycleError::UnconfirmedMovements {
            asset_id,
            movement_ids,
        });
    }

    let now = db_now();
    let mut entries = Vec::new();
    entries.push(
        soft_delete_in(&mut *tx, EntityRef::new(EntityKind::Asset, asset_id), user_id, reason, now)
            .await?,
    );
    for id in MovementRepo::active_ids(&mut *tx, asset_id).await? {
        let child = EntityRef::new(EntityKind::Movement, id);
        entries.push(soft_delete_in(&mut *tx, child, user_id, reason, now).await?);
    }
    for id in StatusHistoryRepo::active_ids(&mut *tx, asset_id).await? {
        let child = EntityRef::new(EntityKind::StatusHistory, id);
        entries.push(soft_delete_in(&mut *tx, child, user_id, reason, now).await?);
    }

    tx.commit().await?;

    tracing::info!(asset_id, records = entries.len(), user_id, "Asset cascade soft-deleted");
    for entry in &entries {
        events.publish(deleted_event(entry, user_id));
    }
    Ok(CascadeReport { asset_id, entries })
}

/// Transactional core of [`soft_delete`].
pub(crate) async fn soft_delete_in(
    conn: &mut PgConnection,
    target: EntityRef,
    user_id: DbId,
    reason: &str,
    now: Timestamp,
) -> Result<RecycleBinEntry, LifecycleError> {
    let entity = target.kind.label();
    let row = SoftDeleteRepo::lock_target(&mut *conn, target.kind, target.id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity,
            id: target.id,
        })?;
    if row.is_deleted() {
        return Err(LifecycleError::AlreadyDeleted {
            entity,
            id: target.id,
        });
    }

    check_no_active_children(conn, target).await?;

    let snapshot = SoftDeleteRepo::snapshot(&mut *conn, target.kind, target.id)
        .await?
        .unwrap_or_default();
    let policy = RetentionConfigRepo::policy_for(&mut *conn, target.kind.module_name()).await?;

    let marked =
        SoftDeleteRepo::mark_deleted(&mut *conn, target.kind, target.id, Some(user_id), reason, now)
            .await?;
    if !marked {
        return Err(LifecycleError::AlreadyDeleted {
            entity,
            id: target.id,
        });
    }

    let entry = RecycleBinRepo::create(
        &mut *conn,
        &CreateRecycleBinEntry {
            entity_kind: target.kind,
            object_id: target.id,
            object_repr: row.object_repr.clone(),
            deleted_by: Some(user_id),
            deletion_reason: reason.to_string(),
            deleted_at: now,
            auto_delete_at: policy.auto_delete_at(now),
        },
    )
    .await?;

    DeletionAuditRepo::create(
        &mut *conn,
        &CreateDeletionAuditLog {
            action: ACTION_SOFT_DELETE,
            entity_kind: target.kind,
            object_id: target.id,
            object_repr: row.object_repr,
            user_id: Some(user_id),
            reason: reason.to_string(),
            snapshot,
            recycle_bin_entry_id: Some(entry.id),
        },
    )
    .await?;

    Ok(entry)
}

/// Offices and catalog items may not be deleted while active assets use
/// them. Soft-deleted assets do not count.
async fn check_no_active_children(
    conn: &mut PgConnection,
    target: EntityRef,
) -> Result<(), LifecycleError> {
    let count = match target.kind {
        EntityKind::Office => AssetRepo::count_active_by_office(&mut *conn, target.id).await?,
        EntityKind::CatalogItem => {
            AssetRepo::count_active_by_catalog_item(&mut *conn, target.id).await?
        }
        EntityKind::Asset | EntityKind::Movement | EntityKind::StatusHistory => 0,
    };
    if count > 0 {
        return Err(LifecycleError::ActiveChildren {
            entity: target.kind.label(),
            id: target.id,
            children: "assets",
            count,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// Restore a soft-deleted record and close its pending ledger entry.
///
/// Only the record itself comes back: a deleted parent stays deleted, and
/// cascaded children keep their own entries.
pub async fn restore(
    pool: &DbPool,
    events: &EventBus,
    target: EntityRef,
    user_id: DbId,
) -> Result<Option<RecycleBinEntry>, LifecycleError> {
    let mut tx = pool.begin().await?;
    let entry = RecycleBinRepo::lock_pending_for(&mut *tx, target.kind, target.id).await?;
    let restored = restore_in(&mut *tx, target, entry, user_id, ACTION_RESTORE).await?;
    tx.commit().await?;

    tracing::info!(
        entity_kind = %target.kind,
        entity_id = target.id,
        user_id,
        "Record restored"
    );
    publish_restored(events, target, restored.as_ref(), user_id);
    Ok(restored)
}

/// Transactional core of [`restore`]. `entry` is the locked pending entry,
/// if any.
pub(crate) async fn restore_in(
    conn: &mut PgConnection,
    target: EntityRef,
    entry: Option<RecycleBinEntry>,
    user_id: DbId,
    action: &'static str,
) -> Result<Option<RecycleBinEntry>, LifecycleError> {
    let entity = target.kind.label();
    let row = SoftDeleteRepo::lock_target(&mut *conn, target.kind, target.id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity,
            id: target.id,
        })?;
    if !row.is_deleted() {
        return Err(LifecycleError::NotDeleted {
            entity,
            id: target.id,
        });
    }

    SoftDeleteRepo::clear_deleted(&mut *conn, target.kind, target.id).await?;

    let now = db_now();
    let restored = match entry {
        Some(mut entry) => {
            if !RecycleBinRepo::mark_restored(&mut *conn, entry.id, user_id, now).await? {
                return Err(LifecycleError::AlreadyRestored { entry_id: entry.id });
            }
            entry.restored_at = Some(now);
            entry.restored_by = Some(user_id);
            Some(entry)
        }
        None => None,
    };

    let snapshot = SoftDeleteRepo::snapshot(&mut *conn, target.kind, target.id)
        .await?
        .unwrap_or_default();
    DeletionAuditRepo::create(
        &mut *conn,
        &CreateDeletionAuditLog {
            action,
            entity_kind: target.kind,
            object_id: target.id,
            object_repr: row.object_repr,
            user_id: Some(user_id),
            reason: String::new(),
            snapshot,
            recycle_bin_entry_id: restored.as_ref().map(|e| e.id),
        },
    )
    .await?;

    Ok(restored)
}

// ---------------------------------------------------------------------------
// Hard delete
// ---------------------------------------------------------------------------

/// Physically remove a record. No ledger or audit bookkeeping.
pub async fn hard_delete(pool: &DbPool, target: EntityRef) -> Result<(), LifecycleError> {
    let entity = target.kind.label();
    let removed = SoftDeleteRepo::hard_delete(pool, target.kind, target.id)
        .await
        .map_err(|e| LifecycleError::from_purge(entity, target.id, e))?;
    if !removed {
        return Err(LifecycleError::NotFound {
            entity,
            id: target.id,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Payload shared by recycle-bin events.
pub(crate) fn entry_payload(entry: &RecycleBinEntry) -> serde_json::Value {
    serde_json::json!({
        "entry_id": entry.id,
        "entity_kind": entry.entity_kind,
        "object_id": entry.object_id,
        "object_repr": entry.object_repr,
        "module_name": entry.module_name,
        "deleted_by": entry.deleted_by,
    })
}

fn deleted_event(entry: &RecycleBinEntry, user_id: DbId) -> PlatformEvent {
    PlatformEvent::new(EVENT_RECORD_DELETED)
        .with_source(entry.entity_kind.clone(), entry.object_id)
        .with_actor(user_id)
        .with_payload(entry_payload(entry))
}

pub(crate) fn publish_restored(
    events: &EventBus,
    target: EntityRef,
    entry: Option<&RecycleBinEntry>,
    user_id: DbId,
) {
    events.publish(
        PlatformEvent::new(EVENT_RECORD_RESTORED)
            .with_source(target.kind.as_str(), target.id)
            .with_actor(user_id),
    );
    if let Some(entry) = entry {
        events.publish(
            PlatformEvent::new(EVENT_RECYCLE_RESTORED)
                .with_source("recycle_bin_entry", entry.id)
                .with_actor(user_id)
                .with_payload(entry_payload(entry)),
        );
    }
}
