//! Scheduled retention jobs: purge expired recycle-bin entries and warn
//! deleters ahead of the deadline.
//!
//! Each job takes `now` explicitly so a run is reproducible. Per-entry and
//! per-user failures are collected into the returned report instead of
//! aborting the run.

use std::collections::BTreeMap;

use chrono::Duration;
use patrimonio_core::audit::ACTION_AUTO_DELETE;
use patrimonio_core::entity::{MODULE_ASSETS, MODULE_CATALOG, MODULE_OFFICES};
use patrimonio_core::notifications::{
    Priority, KIND_RECYCLE_FINAL_WARNING, KIND_RECYCLE_PURGED, KIND_RECYCLE_WARNING,
};
use patrimonio_core::recycle_bin::{EntryState, MAX_NOTIFICATION_SAMPLES};
use patrimonio_core::retention::{days_remaining, hours_remaining, is_expired, WarningKind};
use patrimonio_core::types::{DbId, Timestamp};
use patrimonio_db::models::recycle_bin::RecycleBinEntry;
use patrimonio_db::repositories::{NotificationRepo, RecycleBinRepo, RetentionConfigRepo};
use patrimonio_db::DbPool;
use patrimonio_events::{NotificationMessage, Notifier};
use serde::Serialize;

use crate::error::LifecycleError;
use crate::ledger::purge_in;

/// Modules in purge order: children before the records they reference.
const CLEANUP_ORDER: [&str; 3] = [MODULE_ASSETS, MODULE_CATALOG, MODULE_OFFICES];

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PurgeFailure {
    pub entry_id: DbId,
    pub object_repr: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFailure {
    pub user_id: DbId,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Entries whose record was physically deleted.
    pub purged: usize,
    /// Entries that were restored or no longer expired by the time the lock
    /// was taken.
    pub skipped: usize,
    /// Modules with auto-delete disabled.
    pub skipped_modules: Vec<String>,
    pub failures: Vec<PurgeFailure>,
    pub notification_failures: Vec<NotificationFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarningReport {
    pub kind: WarningKind,
    /// Entries inside the warning window across all enabled modules.
    pub entries: usize,
    pub users_notified: usize,
    /// Users left alone because they were warned recently.
    pub users_skipped: usize,
    pub failures: Vec<NotificationFailure>,
}

enum PurgeOutcome {
    Purged(RecycleBinEntry),
    Missing(RecycleBinEntry),
    Skipped,
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Permanently delete every pending entry whose deadline has passed, in
/// modules that have auto-delete enabled.
pub async fn run_cleanup(
    pool: &DbPool,
    notifier: &dyn Notifier,
    now: Timestamp,
) -> Result<CleanupReport, LifecycleError> {
    let mut report = CleanupReport::default();
    let mut purged_by_user: BTreeMap<DbId, Vec<RecycleBinEntry>> = BTreeMap::new();

    for module in CLEANUP_ORDER {
        let policy = RetentionConfigRepo::policy_for(pool, module).await?;
        if !policy.auto_delete_enabled {
            tracing::info!(module, "Auto-delete disabled, skipping module");
            report.skipped_modules.push(module.to_string());
            continue;
        }

        let expired = RecycleBinRepo::expired_ids(pool, module, now).await?;
        for entry_id in expired {
            match purge_expired(pool, entry_id, now).await {
                Ok(PurgeOutcome::Purged(entry)) => {
                    report.purged += 1;
                    if let Some(user_id) = entry.deleted_by {
                        purged_by_user.entry(user_id).or_default().push(entry);
                    }
                }
                Ok(PurgeOutcome::Missing(entry)) => {
                    tracing::warn!(
                        entry_id,
                        entity_kind = %entry.entity_kind,
                        object_id = entry.object_id,
                        "Expired entry pointed at a missing record, entry removed"
                    );
                    report.failures.push(PurgeFailure {
                        entry_id,
                        object_repr: entry.object_repr,
                        error: "record no longer exists".to_string(),
                    });
                }
                Ok(PurgeOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(entry_id, error = %e, "Auto-delete failed");
                    let object_repr = RecycleBinRepo::find_by_id(pool, entry_id)
                        .await
                        .ok()
                        .flatten()
                        .map(|entry| entry.object_repr)
                        .unwrap_or_default();
                    report.failures.push(PurgeFailure {
                        entry_id,
                        object_repr,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    for (user_id, entries) in purged_by_user {
        let message = purged_message(&entries);
        if let Err(e) = notifier.notify(user_id, &message).await {
            tracing::warn!(user_id, error = %e, "Failed to send purge notification");
            report.notification_failures.push(NotificationFailure {
                user_id,
                error: e.to_string(),
            });
        }
    }

    tracing::info!(
        purged = report.purged,
        skipped = report.skipped,
        failed = report.failures.len(),
        "Recycle-bin cleanup finished"
    );
    Ok(report)
}

/// Re-check one entry under its row lock and purge it if still due.
async fn purge_expired(
    pool: &DbPool,
    entry_id: DbId,
    now: Timestamp,
) -> Result<PurgeOutcome, LifecycleError> {
    let mut tx = pool.begin().await?;
    let Some(entry) = RecycleBinRepo::lock_by_id(&mut *tx, entry_id).await? else {
        return Ok(PurgeOutcome::Skipped);
    };
    if entry.state() != EntryState::Pending || !is_expired(entry.auto_delete_at, now) {
        return Ok(PurgeOutcome::Skipped);
    }

    let purged = purge_in(&mut *tx, &entry, None, ACTION_AUTO_DELETE).await?;
    tx.commit().await?;

    Ok(if purged.is_some() {
        PurgeOutcome::Purged(entry)
    } else {
        PurgeOutcome::Missing(entry)
    })
}

fn purged_message(entries: &[RecycleBinEntry]) -> NotificationMessage {
    let samples: Vec<serde_json::Value> = entries
        .iter()
        .take(MAX_NOTIFICATION_SAMPLES)
        .map(|e| {
            serde_json::json!({
                "entry_id": e.id,
                "entity_kind": e.entity_kind,
                "object_repr": e.object_repr,
                "module_name": e.module_name,
            })
        })
        .collect();

    NotificationMessage::new(
        KIND_RECYCLE_PURGED,
        "Records permanently deleted",
        format!(
            "{} record(s) you deleted reached the end of their retention period and were permanently removed.",
            entries.len()
        ),
    )
    .with_priority(Priority::High)
    .with_payload(serde_json::json!({
        "total": entries.len(),
        "items": samples,
        "automatic": true,
    }))
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Send one consolidated warning per deleter for entries approaching their
/// deadline.
///
/// A user whose entries span modules with different policies is deduplicated
/// on the shortest window among them.
pub async fn run_warnings(
    pool: &DbPool,
    notifier: &dyn Notifier,
    kind: WarningKind,
    now: Timestamp,
) -> Result<WarningReport, LifecycleError> {
    let mut by_user: BTreeMap<DbId, (Duration, Vec<RecycleBinEntry>)> = BTreeMap::new();
    let mut entry_count = 0;

    for module in CLEANUP_ORDER {
        let policy = RetentionConfigRepo::policy_for(pool, module).await?;
        if !policy.auto_delete_enabled {
            continue;
        }
        let (after, until) = policy.warning_window(kind, now);
        let dedup = policy.dedup_window(kind);

        for entry in RecycleBinRepo::list_pending_due_between(pool, module, after, until).await? {
            entry_count += 1;
            let Some(user_id) = entry.deleted_by else {
                continue;
            };
            let slot = by_user.entry(user_id).or_insert((dedup, Vec::new()));
            slot.0 = slot.0.min(dedup);
            slot.1.push(entry);
        }
    }

    let notification_kind = warning_notification_kind(kind);
    let mut report = WarningReport {
        kind,
        entries: entry_count,
        users_notified: 0,
        users_skipped: 0,
        failures: Vec::new(),
    };

    for (user_id, (dedup, mut entries)) in by_user {
        match NotificationRepo::exists_since(pool, user_id, notification_kind, now - dedup).await {
            Ok(true) => {
                report.users_skipped += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                report.failures.push(NotificationFailure {
                    user_id,
                    error: e.to_string(),
                });
                continue;
            }
        }

        entries.sort_by_key(|e| (e.auto_delete_at, e.id));
        let message = warning_message(kind, &entries, now);
        match notifier.notify(user_id, &message).await {
            Ok(()) => report.users_notified += 1,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to send retention warning");
                report.failures.push(NotificationFailure {
                    user_id,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        kind = notification_kind,
        entries = report.entries,
        notified = report.users_notified,
        skipped = report.users_skipped,
        failed = report.failures.len(),
        "Retention warning run finished"
    );
    Ok(report)
}

fn warning_notification_kind(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::Warning => KIND_RECYCLE_WARNING,
        WarningKind::FinalWarning => KIND_RECYCLE_FINAL_WARNING,
    }
}

/// Build the consolidated message. `entries` must be sorted by deadline and
/// non-empty.
fn warning_message(
    kind: WarningKind,
    entries: &[RecycleBinEntry],
    now: Timestamp,
) -> NotificationMessage {
    let total = entries.len();
    let samples: Vec<serde_json::Value> = entries
        .iter()
        .take(MAX_NOTIFICATION_SAMPLES)
        .map(|e| {
            let mut item = serde_json::json!({
                "entry_id": e.id,
                "entity_kind": e.entity_kind,
                "object_repr": e.object_repr,
                "module_name": e.module_name,
                "auto_delete_at": e.auto_delete_at,
                "days_remaining": days_remaining(e.auto_delete_at, now),
            });
            if kind == WarningKind::FinalWarning {
                item["hours_remaining"] = hours_remaining(e.auto_delete_at, now).into();
            }
            item
        })
        .collect();

    let earliest = entries.first().map(|e| e.auto_delete_at).unwrap_or(now);
    let latest = entries.last().map(|e| e.auto_delete_at).unwrap_or(now);

    let message = match kind {
        WarningKind::Warning => NotificationMessage::new(
            KIND_RECYCLE_WARNING,
            "Records scheduled for permanent deletion",
            format!(
                "{total} record(s) in the recycle bin will be permanently deleted in {} day(s) or more. Restore them if they are still needed.",
                days_remaining(earliest, now)
            ),
        )
        .with_priority(Priority::High)
        .with_payload(serde_json::json!({
            "total": total,
            "items": samples,
            "min_days_remaining": days_remaining(earliest, now),
        })),
        WarningKind::FinalWarning => {
            let min_hours = hours_remaining(earliest, now);
            NotificationMessage::new(
                KIND_RECYCLE_FINAL_WARNING,
                "Final warning: permanent deletion imminent",
                format!(
                    "{total} record(s) in the recycle bin will be permanently deleted within {min_hours} hour(s)."
                ),
            )
            .with_priority(Priority::Critical)
            .with_payload(serde_json::json!({
                "total": total,
                "items": samples,
                "min_hours_remaining": min_hours,
            }))
        }
    };
    message.expiring_at(latest)
}
