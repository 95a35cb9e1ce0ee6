//! Integration tests for change replay.
//!
//! Verifies that:
//! - Each change type applies to the registry under the submitting user
//! - Duplicate keys, deleted or stale targets and inactive parents become
//!   conflict records with a server snapshot, and the owner is notified
//! - Broken payloads end in the error state without touching the registry
//! - A session replays strictly in submission order and tallies outcomes
//! - Later edits in a batch are not stale against the batch's own writes

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{
    captured_ago, change, engine, principal, seed_registry, seed_user, stale_change,
    RecordingNotifier, DEVICE,
};
use patrimonio_core::entity::{EntityKind, EntityRef, QueryMode};
use patrimonio_core::notifications::{Priority, KIND_SYNC_CONFLICT};
use patrimonio_core::sync::ChangeType;
use patrimonio_db::repositories::{
    AssetRepo, OfflineChangeRepo, StatusHistoryRepo, SyncConflictRepo,
};
use patrimonio_db::models::asset::UpdateAsset;
use patrimonio_events::EventBus;
use patrimonio_lifecycle::{records, soft_delete};
use patrimonio_sync::ReplayOutcome;
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_change_registers_asset(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(
                ChangeType::Create,
                "AST-100",
                json!({
                    "catalog_item_id": registry.item.id,
                    "office_id": registry.office.id,
                    "brand": "HP",
                    "condition": "n",
                    "qr_code": "device-chosen",
                }),
            )],
        )
        .await
        .unwrap();
    let session = engine.process_session(batch.session.id).await.unwrap();

    assert!(session.is_complete);
    assert_eq!(session.processed_changes, 1);
    assert_eq!(session.succeeded_changes, 1);
    assert_eq!(session.result_message, "Processed 1 of 1: 1 succeeded, 0 failed, 0 conflicts");

    let asset = AssetRepo::find_by_asset_code(&pool, "AST-100", QueryMode::Active)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.brand, "HP");
    assert_eq!(asset.condition, "N");
    assert_eq!(asset.created_by, Some(ana.id));
    assert_ne!(asset.qr_code, "device-chosen");

    let stored = OfflineChangeRepo::find_by_id(&pool, batch.changes[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sync_state, "completed");
    assert_eq!(stored.attempt_count, 1);
    assert!(stored.last_attempt_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_taken_code_is_duplicate_key(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = engine(&pool, notifier.clone());

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(
                ChangeType::Create,
                "AST-001",
                json!({
                    "catalog_item_id": registry.item.id,
                    "office_id": registry.office.id,
                }),
            )],
        )
        .await
        .unwrap();

    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    let conflict = assert_matches!(outcome, ReplayOutcome::Conflict(c) => c);
    assert_eq!(conflict.conflict_kind, "duplicate_key");
    assert_eq!(conflict.server_snapshot["id"], registry.asset.id);
    assert_eq!(conflict.client_payload["catalog_item_id"], registry.item.id);
    assert!(!conflict.resolved);

    let stored = OfflineChangeRepo::find_by_id(&pool, batch.changes[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sync_state, "conflict");

    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ana.id);
    assert_eq!(sent[0].1.kind, KIND_SYNC_CONFLICT);
    assert_eq!(sent[0].1.priority, Priority::High);
    assert_eq!(sent[0].1.payload["conflict_id"], conflict.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_deleted_codes_are_still_taken(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    soft_delete::soft_delete_cascade(&pool, &EventBus::default(), registry.asset.id, ana.id, "lost")
        .await
        .unwrap();
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(
                ChangeType::Create,
                "AST-001",
                json!({
                    "catalog_item_id": registry.item.id,
                    "office_id": registry.office.id,
                }),
            )],
        )
        .await
        .unwrap();

    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    assert_matches!(outcome, ReplayOutcome::Conflict(c) if c.conflict_kind == "duplicate_key");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_under_deleted_office_is_inconsistent(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    soft_delete::soft_delete_cascade(&pool, &EventBus::default(), registry.asset.id, ana.id, "lost")
        .await
        .unwrap();
    soft_delete::soft_delete(
        &pool,
        &EventBus::default(),
        EntityRef::new(EntityKind::Office, registry.office.id),
        ana.id,
        "closed",
    )
    .await
    .unwrap();
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(
                ChangeType::Create,
                "AST-200",
                json!({
                    "catalog_item_id": registry.item.id,
                    "office_id": registry.office.id,
                }),
            )],
        )
        .await
        .unwrap();

    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    let conflict = assert_matches!(outcome, ReplayOutcome::Conflict(c) => c);
    assert_eq!(conflict.conflict_kind, "inconsistent_data");
    assert!(conflict.detail.contains("recycle bin"));
    assert!(AssetRepo::find_by_asset_code(&pool, "AST-200", QueryMode::All)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_without_references_is_an_error(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(ChangeType::Create, "AST-300", json!({"brand": "HP"}))],
        )
        .await
        .unwrap();

    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    assert_matches!(outcome, ReplayOutcome::Error(msg) if msg.contains("catalog_item_id"));
}

// ---------------------------------------------------------------------------
// Update and status change
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_ignores_protected_fields(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(
                ChangeType::Update,
                "AST-001",
                json!({"brand": "Dell", "plate": "abc-123", "qr_code": "forged", "id": 99}),
            )],
        )
        .await
        .unwrap();
    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    assert_matches!(outcome, ReplayOutcome::Completed);

    let asset = AssetRepo::find_by_id(&pool, registry.asset.id, QueryMode::Active)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.brand, "Dell");
    assert_eq!(asset.plate, "ABC-123");
    assert_eq!(asset.qr_code, registry.asset.qr_code);
    assert_eq!(asset.updated_by, Some(ana.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_update_is_target_modified(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![stale_change(ChangeType::Update, "AST-001", json!({"brand": "Dell"}))],
        )
        .await
        .unwrap();
    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    let conflict = assert_matches!(outcome, ReplayOutcome::Conflict(c) => c);
    assert_eq!(conflict.conflict_kind, "target_modified");
    assert_eq!(conflict.server_snapshot["brand"], "Lenovo");
    assert_eq!(conflict.client_payload["brand"], "Dell");

    let asset = AssetRepo::find_by_id(&pool, registry.asset.id, QueryMode::Active)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.brand, "Lenovo");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_change_on_deleted_asset_is_target_deleted(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    soft_delete::soft_delete_cascade(&pool, &EventBus::default(), registry.asset.id, ana.id, "lost")
        .await
        .unwrap();
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![
                change(ChangeType::Update, "AST-001", json!({"brand": "Dell"})),
                change(ChangeType::InventoryScan, "AST-001", json!({})),
                change(ChangeType::StatusChange, "AST-404", json!({"condition": "M"})),
            ],
        )
        .await
        .unwrap();

    for change in &batch.changes {
        let outcome = engine.replay_change(change.id).await.unwrap();
        assert_matches!(outcome, ReplayOutcome::Conflict(c) if c.conflict_kind == "target_deleted");
    }

    let conflict = SyncConflictRepo::find_by_change(&pool, batch.changes[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conflict.server_snapshot["id"], registry.asset.id);
    assert!(!conflict.server_snapshot["deleted_at"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_change_by_scan_code_writes_history(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let mut scanned = change(
        ChangeType::StatusChange,
        "",
        json!({"condition": "m", "reason": "Screen cracked"}),
    );
    scanned.scan_code = Some(registry.asset.qr_code.clone());
    scanned.gps_location = Some("-12.0464,-77.0428".to_string());

    let batch = engine
        .submit_batch(&principal(&ana), DEVICE, vec![scanned])
        .await
        .unwrap();
    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    assert_matches!(outcome, ReplayOutcome::Completed);

    let asset = AssetRepo::find_by_id(&pool, registry.asset.id, QueryMode::Active)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.condition, "M");

    let history = StatusHistoryRepo::list_by_asset(&pool, registry.asset.id, QueryMode::Active)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_condition, "B");
    assert_eq!(history[0].new_condition, "M");
    assert_eq!(history[0].observations, "Screen cracked");
    assert_eq!(history[0].gps_location.as_deref(), Some("-12.0464,-77.0428"));
    assert_eq!(history[0].changed_by, Some(ana.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_change_without_condition_is_an_error(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(ChangeType::StatusChange, "AST-001", json!({"reason": "?"}))],
        )
        .await
        .unwrap();
    let outcome = engine.replay_change(batch.changes[0].id).await.unwrap();
    assert_matches!(outcome, ReplayOutcome::Error(_));

    let stored = OfflineChangeRepo::find_by_id(&pool, batch.changes[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sync_state, "error");
    assert!(stored.error_message.unwrap().contains("condition"));
    assert!(StatusHistoryRepo::list_by_asset(&pool, registry.asset.id, QueryMode::All)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Photo and scan records
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_photo_and_scan_keep_the_condition(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![
                change(ChangeType::AddPhoto, "AST-001", json!({})),
                change(ChangeType::InventoryScan, "AST-001", json!({"observations": "Shelf 4"})),
            ],
        )
        .await
        .unwrap();
    engine.process_session(batch.session.id).await.unwrap();

    let history = StatusHistoryRepo::list_by_asset(&pool, registry.asset.id, QueryMode::Active)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|h| h.previous_condition == "B" && h.new_condition == "B"));
    let mut notes: Vec<_> = history.iter().map(|h| h.observations.as_str()).collect();
    notes.sort_unstable();
    assert_eq!(notes, ["Photo added from mobile device", "Shelf 4"]);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_replays_in_submission_order(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    // The scan only succeeds if the create before it ran first.
    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![
                change(
                    ChangeType::Create,
                    "AST-500",
                    json!({
                        "catalog_item_id": registry.item.id,
                        "office_id": registry.office.id,
                    }),
                ),
                change(ChangeType::InventoryScan, "AST-500", json!({})),
                stale_change(ChangeType::Update, "AST-001", json!({"brand": "Dell"})),
                change(ChangeType::StatusChange, "AST-001", json!({"condition": "X"})),
            ],
        )
        .await
        .unwrap();

    let session = engine.process_session(batch.session.id).await.unwrap();
    assert_eq!(session.processed_changes, 4);
    assert_eq!(session.succeeded_changes, 2);
    assert_eq!(session.conflict_changes, 1);
    assert_eq!(session.failed_changes, 1);
    assert!(session.finished_at.is_some());

    let states: Vec<_> = OfflineChangeRepo::list_by_session(&pool, batch.session.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.sync_state)
        .collect();
    assert_eq!(states, ["completed", "completed", "conflict", "error"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_replaying_a_finished_change_is_skipped(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(ChangeType::AddPhoto, "AST-001", json!({}))],
        )
        .await
        .unwrap();
    let id = batch.changes[0].id;

    assert_matches!(engine.replay_change(id).await.unwrap(), ReplayOutcome::Completed);
    assert_matches!(engine.replay_change(id).await.unwrap(), ReplayOutcome::Skipped);

    let stored = OfflineChangeRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.attempt_count, 1);
}

// ---------------------------------------------------------------------------
// Edits captured together offline
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_batch_edits_follow_their_own_create(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    // Captured in the field half an hour before the device came online.
    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![
                captured_ago(
                    change(
                        ChangeType::Create,
                        "AST-600",
                        json!({
                            "catalog_item_id": registry.item.id,
                            "office_id": registry.office.id,
                            "brand": "HP",
                        }),
                    ),
                    30,
                ),
                captured_ago(change(ChangeType::Update, "AST-600", json!({"color": "gris"})), 20),
                captured_ago(change(ChangeType::Update, "AST-600", json!({"brand": "Dell"})), 15),
                captured_ago(
                    change(ChangeType::StatusChange, "AST-600", json!({"condition": "r"})),
                    10,
                ),
                captured_ago(change(ChangeType::AddPhoto, "AST-600", json!({})), 5),
            ],
        )
        .await
        .unwrap();

    let session = engine.process_session(batch.session.id).await.unwrap();
    assert_eq!(session.succeeded_changes, 5);
    assert_eq!(session.conflict_changes, 0);
    assert_eq!(session.failed_changes, 0);

    let asset = AssetRepo::find_by_asset_code(&pool, "AST-600", QueryMode::Active)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.color, "gris");
    assert_eq!(asset.brand, "Dell");
    assert_eq!(asset.condition, "R");

    let stored = OfflineChangeRepo::list_by_session(&pool, batch.session.id)
        .await
        .unwrap();
    assert_eq!(stored[0].applied_asset_id, Some(asset.id));
    assert_eq!(stored[3].applied_at, Some(asset.updated_at));
    assert_eq!(stored[4].applied_asset_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_server_edit_between_batch_edits_is_target_modified(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![
                captured_ago(
                    change(
                        ChangeType::Create,
                        "AST-601",
                        json!({
                            "catalog_item_id": registry.item.id,
                            "office_id": registry.office.id,
                        }),
                    ),
                    30,
                ),
                captured_ago(change(ChangeType::Update, "AST-601", json!({"brand": "Dell"})), 20),
            ],
        )
        .await
        .unwrap();

    assert_matches!(
        engine.replay_change(batch.changes[0].id).await.unwrap(),
        ReplayOutcome::Completed
    );
    let created = AssetRepo::find_by_asset_code(&pool, "AST-601", QueryMode::Active)
        .await
        .unwrap()
        .unwrap();
    records::update_asset(
        &pool,
        created.id,
        UpdateAsset {
            brand: Some("Acer".to_string()),
            ..Default::default()
        },
        ana.id,
    )
    .await
    .unwrap();

    let outcome = engine.replay_change(batch.changes[1].id).await.unwrap();
    let conflict = assert_matches!(outcome, ReplayOutcome::Conflict(c) => c);
    assert_eq!(conflict.conflict_kind, "target_modified");
    assert_eq!(conflict.server_snapshot["brand"], "Acer");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_other_device_write_still_makes_edits_stale(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let registry = seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let first = engine
        .submit_batch(
            &principal(&ana),
            "tablet-01",
            vec![captured_ago(
                change(
                    ChangeType::Create,
                    "AST-602",
                    json!({
                        "catalog_item_id": registry.item.id,
                        "office_id": registry.office.id,
                    }),
                ),
                30,
            )],
        )
        .await
        .unwrap();
    engine.process_session(first.session.id).await.unwrap();

    let second = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![captured_ago(change(ChangeType::Update, "AST-602", json!({"brand": "Dell"})), 20)],
        )
        .await
        .unwrap();
    let outcome = engine.replay_change(second.changes[0].id).await.unwrap();
    let conflict = assert_matches!(outcome, ReplayOutcome::Conflict(c) => c);
    assert_eq!(conflict.conflict_kind, "target_modified");
}
