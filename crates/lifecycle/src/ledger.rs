//! Recycle-bin ledger operations, checked against the caller's capabilities.
//!
//! Listing scope follows [`Principal::resolve_scope`]: asking for `All`
//! without `ViewAllEntries` is refused, never silently narrowed. Mutations
//! re-check ownership per entry.

use chrono::Duration;
use patrimonio_core::audit::{validate_action, ACTION_BULK_RESTORE, ACTION_PERMANENT_DELETE, ACTION_RESTORE};
use patrimonio_core::entity::{validate_module, EntityKind, EntityRef, QueryMode};
use patrimonio_core::permissions::{Capability, LedgerScope, Principal};
use patrimonio_core::recycle_bin::{EntryState, StateFilter, EXPIRING_SOON_DAYS};
use patrimonio_core::retention::{days_remaining, RetentionPolicy};
use patrimonio_core::security::{
    is_locked_out, lockout_window_start, SecurityCode, ATTEMPT_BULK_PERMANENT_DELETE,
    ATTEMPT_PERMANENT_DELETE,
};
use patrimonio_core::types::{DbId, Timestamp};
use patrimonio_db::models::deletion_audit::{AuditLogFilter, CreateDeletionAuditLog, DeletionAuditLog};
use patrimonio_db::models::recycle_bin::{RecycleBinEntry, RecycleBinFilter, RecycleBinStats};
use patrimonio_db::models::retention_config::{RetentionConfig, UpdateRetentionConfig};
use patrimonio_db::repositories::{
    DeletionAuditRepo, MovementRepo, RecycleBinRepo, RetentionConfigRepo,
    SecurityCodeAttemptRepo, SoftDeleteRepo, StatusHistoryRepo,
};
use patrimonio_db::DbPool;
use patrimonio_events::bus::EVENT_RECYCLE_PURGED;
use patrimonio_events::{EventBus, PlatformEvent};
use serde::Serialize;
use sqlx::PgConnection;

use crate::error::LifecycleError;
use crate::soft_delete::{db_now, entry_payload, publish_restored, restore_in};

const ENTRY_ENTITY: &str = "RecycleBinEntry";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Listing parameters as requested by the caller.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    pub scope: Option<LedgerScope>,
    pub module_name: Option<String>,
    pub entity_kind: Option<EntityKind>,
    pub state: StateFilter,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A ledger entry with its derived state.
#[derive(Debug, Clone, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: RecycleBinEntry,
    pub state: EntryState,
    /// Whole days until automatic deletion; `None` once restored.
    pub days_remaining: Option<i64>,
}

impl EntryView {
    pub fn new(entry: RecycleBinEntry, now: Timestamp) -> Self {
        let state = entry.state();
        let days_remaining =
            (state == EntryState::Pending).then(|| days_remaining(entry.auto_delete_at, now));
        Self {
            entry,
            state,
            days_remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryPage {
    pub scope: LedgerScope,
    pub total: i64,
    pub items: Vec<EntryView>,
}

/// Outcome of one item in a bulk operation.
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemOutcome {
    pub entry_id: DbId,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<BulkItemOutcome>,
}

impl BulkReport {
    fn from_items(items: Vec<BulkItemOutcome>) -> Self {
        let succeeded = items.iter().filter(|i| i.success).count();
        Self {
            succeeded,
            failed: items.len() - succeeded,
            items,
        }
    }
}

/// What a permanent delete removed.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeSummary {
    pub entry_id: DbId,
    pub entity_kind: String,
    pub object_id: DbId,
    pub object_repr: String,
    /// `false` when the record had already disappeared and only the entry
    /// was removed.
    pub entity_existed: bool,
    /// Movement and status-history rows removed with a purged asset.
    pub children_removed: usize,
}

/// Effective retention settings for one module.
#[derive(Debug, Clone, Serialize)]
pub struct RetentionSettings {
    pub module_name: String,
    #[serde(flatten)]
    pub policy: RetentionPolicy,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub async fn list_entries(
    pool: &DbPool,
    principal: &Principal,
    query: EntryQuery,
) -> Result<EntryPage, LifecycleError> {
    let scope = principal.resolve_scope(query.scope)?;
    if let Some(module) = &query.module_name {
        validate_module(module).map_err(LifecycleError::Validation)?;
    }

    let filter = RecycleBinFilter {
        deleted_by: principal.owner_filter(scope),
        module_name: query.module_name,
        entity_kind: query.entity_kind,
        state: query.state,
        search: query.search.filter(|s| !s.trim().is_empty()),
        limit: query.limit,
        offset: query.offset,
    };
    let total = RecycleBinRepo::count(pool, &filter).await?;
    let now = db_now();
    let items = RecycleBinRepo::list(pool, &filter)
        .await?
        .into_iter()
        .map(|e| EntryView::new(e, now))
        .collect();

    Ok(EntryPage {
        scope,
        total,
        items,
    })
}

pub async fn get_entry(
    pool: &DbPool,
    principal: &Principal,
    entry_id: DbId,
) -> Result<EntryView, LifecycleError> {
    let entry = RecycleBinRepo::find_by_id(pool, entry_id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: ENTRY_ENTITY,
            id: entry_id,
        })?;
    principal.check_view(entry.deleted_by)?;
    Ok(EntryView::new(entry, db_now()))
}

/// Dashboard counts within the caller's default scope.
pub async fn statistics(
    pool: &DbPool,
    principal: &Principal,
) -> Result<RecycleBinStats, LifecycleError> {
    let scope = principal.resolve_scope(None)?;
    let expiring_before = db_now() + Duration::days(EXPIRING_SOON_DAYS);
    let stats = RecycleBinRepo::stats(pool, principal.owner_filter(scope), expiring_before).await?;
    Ok(stats)
}

pub async fn list_audit_logs(
    pool: &DbPool,
    principal: &Principal,
    filter: AuditLogFilter,
) -> Result<Vec<DeletionAuditLog>, LifecycleError> {
    principal.require(Capability::ViewAuditLogs)?;
    if let Some(action) = &filter.action {
        validate_action(action).map_err(LifecycleError::Validation)?;
    }
    if let Some(module) = &filter.module_name {
        validate_module(module).map_err(LifecycleError::Validation)?;
    }
    Ok(DeletionAuditRepo::list(pool, &filter).await?)
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// Restore the record behind a pending entry.
pub async fn restore_entry(
    pool: &DbPool,
    events: &EventBus,
    principal: &Principal,
    entry_id: DbId,
) -> Result<RecycleBinEntry, LifecycleError> {
    let mut tx = pool.begin().await?;
    let entry = restore_entry_in(&mut *tx, principal, entry_id, ACTION_RESTORE).await?;
    tx.commit().await?;

    tracing::info!(entry_id, user_id = principal.user_id, "Recycle-bin entry restored");
    publish_restored(events, target_of(&entry)?, Some(&entry), principal.user_id);
    Ok(entry)
}

/// Restore several entries. Each entry is checked and committed on its own,
/// so one failure does not undo the others.
pub async fn bulk_restore(
    pool: &DbPool,
    events: &EventBus,
    principal: &Principal,
    entry_ids: &[DbId],
) -> Result<BulkReport, LifecycleError> {
    principal.require(Capability::BulkRestore)?;

    let mut items = Vec::with_capacity(entry_ids.len());
    for &entry_id in entry_ids {
        let result = async {
            let mut tx = pool.begin().await?;
            let entry = restore_entry_in(&mut *tx, principal, entry_id, ACTION_BULK_RESTORE).await?;
            tx.commit().await?;
            Ok::<_, LifecycleError>(entry)
        }
        .await;

        match result {
            Ok(entry) => {
                if let Ok(target) = target_of(&entry) {
                    publish_restored(events, target, Some(&entry), principal.user_id);
                }
                items.push(BulkItemOutcome {
                    entry_id,
                    success: true,
                    error: None,
                });
            }
            Err(e) => {
                tracing::warn!(entry_id, error = %e, "Bulk restore item failed");
                items.push(BulkItemOutcome {
                    entry_id,
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let report = BulkReport::from_items(items);
    tracing::info!(
        user_id = principal.user_id,
        succeeded = report.succeeded,
        failed = report.failed,
        "Bulk restore finished"
    );
    Ok(report)
}

async fn restore_entry_in(
    conn: &mut PgConnection,
    principal: &Principal,
    entry_id: DbId,
    action: &'static str,
) -> Result<RecycleBinEntry, LifecycleError> {
    let entry = RecycleBinRepo::lock_by_id(&mut *conn, entry_id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: ENTRY_ENTITY,
            id: entry_id,
        })?;
    principal.check_restore(entry.deleted_by)?;
    if entry.state() == EntryState::Restored {
        return Err(LifecycleError::AlreadyRestored { entry_id });
    }

    let target = target_of(&entry)?;
    restore_in(conn, target, Some(entry), principal.user_id, action)
        .await?
        .ok_or(LifecycleError::AlreadyRestored { entry_id })
}

// ---------------------------------------------------------------------------
// Permanent delete
// ---------------------------------------------------------------------------

/// Check the security code for a permanent delete.
///
/// Refuses users with too many recent failures before looking at the code.
/// A wrong code is recorded as a failed attempt.
async fn verify_security_code(
    pool: &DbPool,
    principal: &Principal,
    code: &SecurityCode,
    supplied: &str,
    attempt_type: &'static str,
    entry_ids: &[DbId],
) -> Result<(), LifecycleError> {
    if !code.is_configured() {
        return Err(LifecycleError::InvalidConfiguration(
            "no permanent-delete security code is configured".to_string(),
        ));
    }
    let since = lockout_window_start(db_now());
    let failures =
        SecurityCodeAttemptRepo::count_recent_failures(pool, principal.user_id, since).await?;
    if is_locked_out(failures) {
        tracing::warn!(user_id = principal.user_id, failures, "Security code lockout");
        return Err(LifecycleError::SecurityLockout);
    }
    if !code.matches(supplied) {
        SecurityCodeAttemptRepo::create(pool, principal.user_id, attempt_type, false, entry_ids)
            .await?;
        tracing::warn!(user_id = principal.user_id, ?entry_ids, "Wrong security code");
        return Err(LifecycleError::InvalidSecurityCode);
    }
    Ok(())
}

/// Physically delete the record behind a pending entry and drop the entry.
///
/// Requires `PermanentDelete` and the configured security code.
pub async fn permanent_delete(
    pool: &DbPool,
    events: &EventBus,
    principal: &Principal,
    code: &SecurityCode,
    supplied_code: &str,
    entry_id: DbId,
) -> Result<PurgeSummary, LifecycleError> {
    principal.require(Capability::PermanentDelete)?;
    verify_security_code(
        pool,
        principal,
        code,
        supplied_code,
        ATTEMPT_PERMANENT_DELETE,
        &[entry_id],
    )
    .await?;

    let summary = purge_entry(pool, events, principal, entry_id).await?;
    SecurityCodeAttemptRepo::create(
        pool,
        principal.user_id,
        ATTEMPT_PERMANENT_DELETE,
        true,
        &[entry_id],
    )
    .await?;
    Ok(summary)
}

/// Permanent delete of several entries under one security-code check.
/// Each entry is purged in its own transaction.
pub async fn bulk_permanent_delete(
    pool: &DbPool,
    events: &EventBus,
    principal: &Principal,
    code: &SecurityCode,
    supplied_code: &str,
    entry_ids: &[DbId],
) -> Result<BulkReport, LifecycleError> {
    principal.require(Capability::PermanentDelete)?;
    verify_security_code(
        pool,
        principal,
        code,
        supplied_code,
        ATTEMPT_BULK_PERMANENT_DELETE,
        entry_ids,
    )
    .await?;

    let mut items = Vec::with_capacity(entry_ids.len());
    for &entry_id in entry_ids {
        let outcome = match purge_entry(pool, events, principal, entry_id).await {
            Ok(_) => BulkItemOutcome {
                entry_id,
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!(entry_id, error = %e, "Bulk permanent delete item failed");
                BulkItemOutcome {
                    entry_id,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };
        items.push(outcome);
    }

    let purged: Vec<DbId> = items.iter().filter(|i| i.success).map(|i| i.entry_id).collect();
    if !purged.is_empty() {
        SecurityCodeAttemptRepo::create(
            pool,
            principal.user_id,
            ATTEMPT_BULK_PERMANENT_DELETE,
            true,
            &purged,
        )
        .await?;
    }
    Ok(BulkReport::from_items(items))
}

async fn purge_entry(
    pool: &DbPool,
    events: &EventBus,
    principal: &Principal,
    entry_id: DbId,
) -> Result<PurgeSummary, LifecycleError> {
    let mut tx = pool.begin().await?;
    let entry = RecycleBinRepo::lock_by_id(&mut *tx, entry_id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: ENTRY_ENTITY,
            id: entry_id,
        })?;
    if entry.state() == EntryState::Restored {
        return Err(LifecycleError::AlreadyRestored { entry_id });
    }
    let purged = purge_in(&mut *tx, &entry, Some(principal.user_id), ACTION_PERMANENT_DELETE).await?;
    tx.commit().await?;

    tracing::info!(
        entry_id,
        entity_kind = %entry.entity_kind,
        object_id = entry.object_id,
        user_id = principal.user_id,
        children_removed = purged.unwrap_or(0),
        "Recycle-bin entry permanently deleted"
    );
    events.publish(
        PlatformEvent::new(EVENT_RECYCLE_PURGED)
            .with_source("recycle_bin_entry", entry.id)
            .with_actor(principal.user_id)
            .with_payload(entry_payload(&entry)),
    );

    Ok(PurgeSummary {
        entry_id,
        entity_kind: entry.entity_kind,
        object_id: entry.object_id,
        object_repr: entry.object_repr,
        entity_existed: purged.is_some(),
        children_removed: purged.unwrap_or(0),
    })
}

/// Audit, hard-delete and drop the entry, inside the caller's transaction.
///
/// Returns `None` if the record was already gone (the entry is removed
/// either way), otherwise the number of child rows removed with it.
pub(crate) async fn purge_in(
    conn: &mut PgConnection,
    entry: &RecycleBinEntry,
    user_id: Option<DbId>,
    action: &'static str,
) -> Result<Option<usize>, LifecycleError> {
    let target = target_of(entry)?;
    let entity = target.kind.label();

    let existing = SoftDeleteRepo::lock_target(&mut *conn, target.kind, target.id).await?;
    if existing.is_none() {
        RecycleBinRepo::delete(&mut *conn, entry.id).await?;
        return Ok(None);
    }

    let children_removed = if target.kind == EntityKind::Asset {
        purge_asset_children(conn, target.id, user_id, action).await?
    } else {
        0
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
            object_repr: entry.object_repr.clone(),
            user_id,
            reason: entry.deletion_reason.clone(),
            snapshot,
            recycle_bin_entry_id: Some(entry.id),
        },
    )
    .await?;

    SoftDeleteRepo::hard_delete(&mut *conn, target.kind, target.id)
        .await
        .map_err(|e| LifecycleError::from_purge(entity, target.id, e))?;
    RecycleBinRepo::delete(&mut *conn, entry.id).await?;

    Ok(Some(children_removed))
}

/// Audit the movement and status-history rows that the database removes
/// together with an asset, and drop their pending entries.
///
/// Refuses while any of them is active, e.g. after it was restored on its own.
async fn purge_asset_children(
    conn: &mut PgConnection,
    asset_id: DbId,
    user_id: Option<DbId>,
    action: &'static str,
) -> Result<usize, LifecycleError> {
    let mut children = Vec::new();
    for movement in MovementRepo::list_by_asset(&mut *conn, asset_id, QueryMode::All).await? {
        children.push(EntityRef::new(EntityKind::Movement, movement.id));
    }
    for row in StatusHistoryRepo::list_by_asset(&mut *conn, asset_id, QueryMode::All).await? {
        children.push(EntityRef::new(EntityKind::StatusHistory, row.id));
    }

    let mut locked = Vec::with_capacity(children.len());
    for child in children {
        if let Some(state) = SoftDeleteRepo::lock_target(&mut *conn, child.kind, child.id).await? {
            locked.push((child, state));
        }
    }
    let active = locked.iter().filter(|(_, state)| !state.is_deleted()).count();
    if active > 0 {
        return Err(LifecycleError::ActiveChildren {
            entity: EntityKind::Asset.label(),
            id: asset_id,
            children: "movement or status-history records",
            count: active as i64,
        });
    }

    for (child, state) in &locked {
        let pending = RecycleBinRepo::lock_pending_for(&mut *conn, child.kind, child.id).await?;
        let snapshot = SoftDeleteRepo::snapshot(&mut *conn, child.kind, child.id)
            .await?
            .unwrap_or_default();
        DeletionAuditRepo::create(
            &mut *conn,
            &CreateDeletionAuditLog {
                action,
                entity_kind: child.kind,
                object_id: child.id,
                object_repr: state.object_repr.clone(),
                user_id,
                reason: pending
                    .as_ref()
                    .map(|e| e.deletion_reason.clone())
                    .unwrap_or_default(),
                snapshot,
                recycle_bin_entry_id: pending.as_ref().map(|e| e.id),
            },
        )
        .await?;
        if let Some(pending) = pending {
            RecycleBinRepo::delete(&mut *conn, pending.id).await?;
        }
    }
    Ok(locked.len())
}

fn target_of(entry: &RecycleBinEntry) -> Result<EntityRef, LifecycleError> {
    let kind = entry.kind().map_err(LifecycleError::Internal)?;
    Ok(EntityRef::new(kind, entry.object_id))
}

// ---------------------------------------------------------------------------
// Retention settings
// ---------------------------------------------------------------------------

pub async fn list_retention_settings(
    pool: &DbPool,
    principal: &Principal,
) -> Result<Vec<RetentionSettings>, LifecycleError> {
    principal.require(Capability::ViewOwnEntries)?;
    let stored = RetentionConfigRepo::list(pool).await?;

    let mut settings: Vec<RetentionSettings> = patrimonio_core::entity::VALID_MODULES
        .iter()
        .map(|module| RetentionSettings {
            module_name: module.to_string(),
            policy: stored
                .iter()
                .find(|c| c.module_name == *module)
                .map(RetentionConfig::policy)
                .unwrap_or_default(),
        })
        .collect();
    settings.sort_by(|a, b| a.module_name.cmp(&b.module_name));
    Ok(settings)
}

pub async fn get_retention_settings(
    pool: &DbPool,
    principal: &Principal,
    module_name: &str,
) -> Result<RetentionSettings, LifecycleError> {
    principal.require(Capability::ViewOwnEntries)?;
    validate_module(module_name).map_err(LifecycleError::Validation)?;
    Ok(RetentionSettings {
        module_name: module_name.to_string(),
        policy: RetentionConfigRepo::policy_for(pool, module_name).await?,
    })
}

/// Change a module's retention. Existing entries keep the deadline they
/// were stamped with.
pub async fn update_retention_settings(
    pool: &DbPool,
    principal: &Principal,
    module_name: &str,
    update: &UpdateRetentionConfig,
) -> Result<RetentionConfig, LifecycleError> {
    principal.require(Capability::ManageRetention)?;
    validate_module(module_name).map_err(LifecycleError::Validation)?;

    let current = RetentionConfigRepo::policy_for(pool, module_name).await?;
    let policy = update.apply(current);
    policy
        .validate()
        .map_err(LifecycleError::InvalidConfiguration)?;

    let saved =
        RetentionConfigRepo::upsert(pool, module_name, &policy, Some(principal.user_id)).await?;
    tracing::info!(
        module = module_name,
        retention_days = policy.retention_days,
        auto_delete_enabled = policy.auto_delete_enabled,
        user_id = principal.user_id,
        "Retention settings updated"
    );
    Ok(saved)
}
