//! Integration tests for the recycle-bin ledger service.
//!
//! Verifies that:
//! - Reads are scoped by role and an unauthorised `All` request is denied
//! - Restore re-checks ownership and capability on every call
//! - Two concurrent restores of one entry produce exactly one success
//! - Bulk operations report per-item outcomes without undoing successes
//! - Permanent delete is administrator-only, needs the security code and
//!   removes entity and entry
//! - Every security-code check is recorded; repeated failures lock the user out
//! - Purging an asset audits each movement and history row it takes along
//! - Retention updates are validated and administrator-only

mod common;

use assert_matches::assert_matches;
use common::{principal, security_code, seed_office, seed_registry, seed_user, PURGE_CODE};
use patrimonio_core::audit::ACTION_PERMANENT_DELETE;
use patrimonio_core::security::{SecurityCode, MAX_FAILED_ATTEMPTS};
use patrimonio_core::entity::{EntityKind, EntityRef, QueryMode};
use patrimonio_core::permissions::{LedgerScope, Principal};
use patrimonio_core::recycle_bin::{EntryState, StateFilter};
use patrimonio_db::models::deletion_audit::AuditLogFilter;
use patrimonio_db::models::recycle_bin::RecycleBinEntry;
use patrimonio_db::models::retention_config::UpdateRetentionConfig;
use patrimonio_db::models::user::User;
use patrimonio_db::repositories::{
    AssetRepo, DeletionAuditRepo, OfficeRepo, RecycleBinRepo, SecurityCodeAttemptRepo,
    StatusHistoryRepo,
};
use patrimonio_events::bus::EVENT_RECYCLE_PURGED;
use patrimonio_events::EventBus;
use patrimonio_lifecycle::ledger::{self, EntryQuery, PurgeSummary};
use patrimonio_lifecycle::records::{self, StatusChange};
use patrimonio_lifecycle::{soft_delete, LifecycleError};
use sqlx::PgPool;

async fn delete_office(pool: &PgPool, bus: &EventBus, code: &str, user_id: i64) -> RecycleBinEntry {
    let office = seed_office(pool, code, user_id).await;
    soft_delete::soft_delete(
        pool,
        bus,
        EntityRef::new(EntityKind::Office, office.id),
        user_id,
        "cleanup",
    )
    .await
    .unwrap()
}

async fn purge(
    pool: &PgPool,
    bus: &EventBus,
    admin: &User,
    entry_id: i64,
) -> Result<PurgeSummary, LifecycleError> {
    ledger::permanent_delete(pool, bus, &principal(admin), &security_code(), PURGE_CODE, entry_id)
        .await
}

// ---------------------------------------------------------------------------
// Scoped reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_staff_sees_only_own_entries(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let luis = seed_user(&pool, "luis", "staff").await;
    delete_office(&pool, &bus, "OF-A", ana.id).await;
    delete_office(&pool, &bus, "OF-B", luis.id).await;

    let page = ledger::list_entries(&pool, &principal(&ana), EntryQuery::default())
        .await
        .unwrap();
    assert_eq!(page.scope, LedgerScope::Own);
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].entry.deleted_by, Some(ana.id));
    assert_eq!(page.items[0].state, EntryState::Pending);
    assert_eq!(page.items[0].days_remaining, Some(29));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_staff_requesting_all_is_denied(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;

    let err = ledger::list_entries(
        &pool,
        &principal(&ana),
        EntryQuery {
            scope: Some(LedgerScope::All),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_auditor_sees_all_but_cannot_restore(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let auditor = seed_user(&pool, "auditor", "auditor").await;
    let entry = delete_office(&pool, &bus, "OF-A", ana.id).await;

    let page = ledger::list_entries(&pool, &principal(&auditor), EntryQuery::default())
        .await
        .unwrap();
    assert_eq!(page.scope, LedgerScope::All);
    assert_eq!(page.total, 1);

    let err = ledger::restore_entry(&pool, &bus, &principal(&auditor), entry.id)
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_read_only_and_inactive_users_are_denied(pool: PgPool) {
    let reader = seed_user(&pool, "reader", "read_only").await;
    let err = ledger::list_entries(&pool, &principal(&reader), EntryQuery::default())
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));

    let admin = seed_user(&pool, "admin", "administrator").await;
    let inactive = Principal {
        is_active: false,
        ..principal(&admin)
    };
    let err = ledger::statistics(&pool, &inactive).await.unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_state_filter_and_search(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let first = delete_office(&pool, &bus, "OF-ALFA", admin.id).await;
    delete_office(&pool, &bus, "OF-BETA", admin.id).await;
    ledger::restore_entry(&pool, &bus, &principal(&admin), first.id)
        .await
        .unwrap();

    let restored = ledger::list_entries(
        &pool,
        &principal(&admin),
        EntryQuery {
            state: StateFilter::Restored,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(restored.total, 1);
    assert_eq!(restored.items[0].state, EntryState::Restored);
    assert_eq!(restored.items[0].days_remaining, None);

    let searched = ledger::list_entries(
        &pool,
        &principal(&admin),
        EntryQuery {
            state: StateFilter::All,
            search: Some("beta".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(searched.total, 1);
    assert_eq!(searched.items[0].entry.object_repr, "OF-BETA - Oficina OF-BETA");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_module_filter_is_rejected(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "administrator").await;
    let err = ledger::list_entries(
        &pool,
        &principal(&admin),
        EntryQuery {
            module_name: Some("vehicles".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::Validation(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_statistics_are_scoped(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let admin = seed_user(&pool, "admin", "administrator").await;
    delete_office(&pool, &bus, "OF-A", ana.id).await;
    delete_office(&pool, &bus, "OF-B", admin.id).await;

    let own = ledger::statistics(&pool, &principal(&ana)).await.unwrap();
    assert_eq!(own.pending_total, 1);

    let all = ledger::statistics(&pool, &principal(&admin)).await.unwrap();
    assert_eq!(all.pending_total, 2);
    assert_eq!(all.expiring_soon, 0);
    assert_eq!(all.by_module.len(), 1);
    assert_eq!(all.by_module[0].module_name, "offices");
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_staff_cannot_restore_others_entries(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let luis = seed_user(&pool, "luis", "staff").await;
    let admin = seed_user(&pool, "admin", "administrator").await;
    let entry = delete_office(&pool, &bus, "OF-A", ana.id).await;

    let err = ledger::restore_entry(&pool, &bus, &principal(&luis), entry.id)
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));

    let restored = ledger::restore_entry(&pool, &bus, &principal(&admin), entry.id)
        .await
        .unwrap();
    assert_eq!(restored.restored_by, Some(admin.id));
    assert!(OfficeRepo::find_by_id(&pool, entry.object_id, QueryMode::Active)
        .await
        .unwrap()
        .is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_restore_twice_reports_already_restored(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let entry = delete_office(&pool, &bus, "OF-A", ana.id).await;

    ledger::restore_entry(&pool, &bus, &principal(&ana), entry.id)
        .await
        .unwrap();
    let err = ledger::restore_entry(&pool, &bus, &principal(&ana), entry.id)
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::AlreadyRestored { entry_id } if entry_id == entry.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_restores_have_one_winner(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let entry = delete_office(&pool, &bus, "OF-A", ana.id).await;
    let who = principal(&ana);

    let (a, b) = tokio::join!(
        ledger::restore_entry(&pool, &bus, &who, entry.id),
        ledger::restore_entry(&pool, &bus, &who, entry.id),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.into_iter().find_map(Result::err).unwrap();
    assert_matches!(loser, LifecycleError::AlreadyRestored { .. });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_restore_reports_each_item(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let luis = seed_user(&pool, "luis", "staff").await;
    let own = delete_office(&pool, &bus, "OF-A", ana.id).await;
    let foreign = delete_office(&pool, &bus, "OF-B", luis.id).await;

    let report = ledger::bulk_restore(&pool, &bus, &principal(&ana), &[own.id, foreign.id, 9_999])
        .await
        .unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);
    assert!(report.items[0].success);
    assert!(!report.items[1].success);
    assert!(report.items[2].error.as_deref().unwrap().contains("not found"));

    let entry = RecycleBinRepo::find_by_id(&pool, own.id).await.unwrap().unwrap();
    assert_eq!(entry.state(), EntryState::Restored);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_restore_requires_capability(pool: PgPool) {
    let bus = EventBus::default();
    let auditor = seed_user(&pool, "auditor", "auditor").await;
    let err = ledger::bulk_restore(&pool, &bus, &principal(&auditor), &[1])
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));
}

// ---------------------------------------------------------------------------
// Permanent delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_permanent_delete_is_admin_only(pool: PgPool) {
    let bus = EventBus::default();
    let ana = seed_user(&pool, "ana", "staff").await;
    let entry = delete_office(&pool, &bus, "OF-A", ana.id).await;

    let err = ledger::permanent_delete(
        &pool,
        &bus,
        &principal(&ana),
        &security_code(),
        PURGE_CODE,
        entry.id,
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));
    assert!(RecycleBinRepo::find_by_id(&pool, entry.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_permanent_delete_removes_entity_and_entry(pool: PgPool) {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let entry = delete_office(&pool, &bus, "OF-A", admin.id).await;
    let _ = rx.try_recv();

    let summary = purge(&pool, &bus, &admin, entry.id)
        .await
        .unwrap();
    assert!(summary.entity_existed);
    assert_eq!(summary.object_repr, "OF-A - Oficina OF-A");

    assert!(OfficeRepo::find_by_id(&pool, entry.object_id, QueryMode::All)
        .await
        .unwrap()
        .is_none());
    assert!(RecycleBinRepo::find_by_id(&pool, entry.id).await.unwrap().is_none());

    let logs = ledger::list_audit_logs(
        &pool,
        &principal(&admin),
        AuditLogFilter {
            action: Some(ACTION_PERMANENT_DELETE.to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].object_id, entry.object_id);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.event_type, EVENT_RECYCLE_PURGED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_permanent_delete_of_asset_drops_child_entries(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let reg = seed_registry(&pool, admin.id).await;
    records::change_status(
        &pool,
        reg.asset.id,
        StatusChange {
            condition: "M".to_string(),
            observations: None,
            gps_location: None,
        },
        admin.id,
    )
    .await
    .unwrap();
    let report = soft_delete::soft_delete_cascade(&pool, &bus, reg.asset.id, admin.id, "")
        .await
        .unwrap();

    purge(&pool, &bus, &admin, report.entries[0].id)
        .await
        .unwrap();

    assert!(AssetRepo::find_by_id(&pool, reg.asset.id, QueryMode::All)
        .await
        .unwrap()
        .is_none());
    assert!(StatusHistoryRepo::list_by_asset(&pool, reg.asset.id, QueryMode::All)
        .await
        .unwrap()
        .is_empty());
    for entry in &report.entries {
        assert!(RecycleBinRepo::find_by_id(&pool, entry.id).await.unwrap().is_none());
    }

    // The history row went with the asset; it still leaves its own audit trail.
    let history_entry = report
        .entries
        .iter()
        .find(|e| e.entity_kind == "status_history")
        .unwrap();
    let trail = DeletionAuditRepo::list_for_object(
        &pool,
        EntityKind::StatusHistory,
        history_entry.object_id,
    )
    .await
    .unwrap();
    let purged = trail
        .iter()
        .find(|log| log.action == ACTION_PERMANENT_DELETE)
        .unwrap();
    assert_eq!(purged.recycle_bin_entry_id, Some(history_entry.id));
    assert_eq!(purged.user_id, Some(admin.id));
    assert_eq!(purged.snapshot["asset_id"], reg.asset.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_permanent_delete_of_asset_with_restored_child_is_refused(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let reg = seed_registry(&pool, admin.id).await;
    let history = records::change_status(
        &pool,
        reg.asset.id,
        StatusChange {
            condition: "M".to_string(),
            observations: None,
            gps_location: None,
        },
        admin.id,
    )
    .await
    .unwrap();
    let report = soft_delete::soft_delete_cascade(&pool, &bus, reg.asset.id, admin.id, "")
        .await
        .unwrap();
    soft_delete::restore(
        &pool,
        &bus,
        EntityRef::new(EntityKind::StatusHistory, history.id),
        admin.id,
    )
    .await
    .unwrap();

    let err = purge(&pool, &bus, &admin, report.entries[0].id)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        LifecycleError::ActiveChildren { entity: "Asset", count: 1, .. }
    );
    assert!(AssetRepo::find_by_id(&pool, reg.asset.id, QueryMode::All)
        .await
        .unwrap()
        .is_some());
    let still_there = RecycleBinRepo::find_by_id(&pool, report.entries[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_there.state(), EntryState::Pending);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_permanent_delete_requires_the_security_code(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let entry = delete_office(&pool, &bus, "OF-A", admin.id).await;

    let err = ledger::permanent_delete(
        &pool,
        &bus,
        &principal(&admin),
        &security_code(),
        "guess",
        entry.id,
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::InvalidSecurityCode);
    assert!(OfficeRepo::find_by_id(&pool, entry.object_id, QueryMode::All)
        .await
        .unwrap()
        .is_some());

    let err = ledger::permanent_delete(
        &pool,
        &bus,
        &principal(&admin),
        &SecurityCode::default(),
        PURGE_CODE,
        entry.id,
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::InvalidConfiguration(_));

    purge(&pool, &bus, &admin, entry.id).await.unwrap();

    let attempts = SecurityCodeAttemptRepo::list_for_user(&pool, admin.id)
        .await
        .unwrap();
    let outcomes: Vec<bool> = attempts.iter().map(|a| a.success).collect();
    assert_eq!(outcomes, [true, false]);
    assert_eq!(attempts[0].recycle_bin_entry_ids, vec![entry.id]);
    assert_eq!(attempts[1].attempt_type, "permanent_delete");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repeated_wrong_codes_lock_the_user_out(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let entry = delete_office(&pool, &bus, "OF-A", admin.id).await;

    for _ in 0..MAX_FAILED_ATTEMPTS {
        let err = ledger::permanent_delete(
            &pool,
            &bus,
            &principal(&admin),
            &security_code(),
            "guess",
            entry.id,
        )
        .await
        .unwrap_err();
        assert_matches!(err, LifecycleError::InvalidSecurityCode);
    }

    // Even the right code is refused while locked out, and not recorded.
    let err = purge(&pool, &bus, &admin, entry.id).await.unwrap_err();
    assert_matches!(err, LifecycleError::SecurityLockout);
    let attempts = SecurityCodeAttemptRepo::list_for_user(&pool, admin.id)
        .await
        .unwrap();
    assert_eq!(attempts.len() as i64, MAX_FAILED_ATTEMPTS);

    let err = ledger::bulk_permanent_delete(
        &pool,
        &bus,
        &principal(&admin),
        &security_code(),
        PURGE_CODE,
        &[entry.id],
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::SecurityLockout);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bulk_permanent_delete_checks_the_code_once(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let first = delete_office(&pool, &bus, "OF-A", admin.id).await;
    let second = delete_office(&pool, &bus, "OF-B", admin.id).await;

    let err = ledger::bulk_permanent_delete(
        &pool,
        &bus,
        &principal(&admin),
        &security_code(),
        "guess",
        &[first.id, second.id],
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::InvalidSecurityCode);

    let report = ledger::bulk_permanent_delete(
        &pool,
        &bus,
        &principal(&admin),
        &security_code(),
        PURGE_CODE,
        &[first.id, second.id, 9999],
    )
    .await
    .unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);

    let attempts = SecurityCodeAttemptRepo::list_for_user(&pool, admin.id)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[0].success);
    assert_eq!(attempts[0].attempt_type, "bulk_permanent_delete");
    assert_eq!(attempts[0].recycle_bin_entry_ids, vec![first.id, second.id]);
    assert!(!attempts[1].success);
    assert_eq!(attempts[1].recycle_bin_entry_ids, vec![first.id, second.id, 9999]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_permanent_delete_of_referenced_office_is_refused(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let reg = seed_registry(&pool, admin.id).await;
    soft_delete::soft_delete_cascade(&pool, &bus, reg.asset.id, admin.id, "")
        .await
        .unwrap();
    let entry = soft_delete::soft_delete(
        &pool,
        &bus,
        EntityRef::new(EntityKind::Office, reg.office.id),
        admin.id,
        "",
    )
    .await
    .unwrap();

    let err = purge(&pool, &bus, &admin, entry.id)
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::StillReferenced { entity: "Office", .. });
    let still_there = RecycleBinRepo::find_by_id(&pool, entry.id).await.unwrap().unwrap();
    assert_eq!(still_there.state(), EntryState::Pending);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_permanent_delete_of_restored_entry_fails(pool: PgPool) {
    let bus = EventBus::default();
    let admin = seed_user(&pool, "admin", "administrator").await;
    let entry = delete_office(&pool, &bus, "OF-A", admin.id).await;
    ledger::restore_entry(&pool, &bus, &principal(&admin), entry.id)
        .await
        .unwrap();

    let err = purge(&pool, &bus, &admin, entry.id)
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::AlreadyRestored { .. });
}

// ---------------------------------------------------------------------------
// Audit and retention settings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_audit_logs_require_capability(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let err = ledger::list_audit_logs(&pool, &principal(&ana), AuditLogFilter::default())
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));

    let auditor = seed_user(&pool, "auditor", "auditor").await;
    let err = ledger::list_audit_logs(
        &pool,
        &principal(&auditor),
        AuditLogFilter {
            action: Some("shred".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::Validation(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retention_settings_round_trip(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "administrator").await;
    let ana = seed_user(&pool, "ana", "staff").await;

    let all = ledger::list_retention_settings(&pool, &principal(&ana))
        .await
        .unwrap();
    let modules: Vec<_> = all.iter().map(|s| s.module_name.as_str()).collect();
    assert_eq!(modules, ["assets", "catalog", "offices"]);

    let update = UpdateRetentionConfig {
        retention_days: Some(60),
        warning_days_before: Some(14),
        final_warning_days_before: Some(2),
        auto_delete_enabled: Some(false),
    };
    let err = ledger::update_retention_settings(&pool, &principal(&ana), "assets", &update)
        .await
        .unwrap_err();
    assert_matches!(err, LifecycleError::PermissionDenied(_));

    let saved = ledger::update_retention_settings(&pool, &principal(&admin), "assets", &update)
        .await
        .unwrap();
    assert_eq!(saved.retention_days, 60);
    assert_eq!(saved.updated_by, Some(admin.id));

    let read = ledger::get_retention_settings(&pool, &principal(&ana), "assets")
        .await
        .unwrap();
    assert!(!read.policy.auto_delete_enabled);
    assert_eq!(read.policy.warning_days_before, 14);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_retention_thresholds_are_rejected(pool: PgPool) {
    let admin = seed_user(&pool, "admin", "administrator").await;

    let err = ledger::update_retention_settings(
        &pool,
        &principal(&admin),
        "offices",
        &UpdateRetentionConfig {
            retention_days: Some(5),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::InvalidConfiguration(_));

    let err = ledger::update_retention_settings(
        &pool,
        &principal(&admin),
        "vehicles",
        &UpdateRetentionConfig::default(),
    )
    .await
    .unwrap_err();
    assert_matches!(err, LifecycleError::Validation(_));
}
