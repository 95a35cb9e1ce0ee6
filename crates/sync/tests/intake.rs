//! Integration tests for batch submission and the pending queue.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::{change, engine, principal, seed_registry, seed_user, RecordingNotifier, DEVICE};
use patrimonio_core::sync::ChangeType;
use patrimonio_db::repositories::OfflineChangeRepo;
use patrimonio_sync::SyncError;
use serde_json::json;
use sqlx::PgPool;

async fn session_count(pool: &PgPool) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_sessions")
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_batch_keeps_submission_order(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            " tablet-07 ",
            vec![
                change(ChangeType::InventoryScan, "AST-001", json!({})),
                change(ChangeType::StatusChange, "AST-001", json!({"condition": "R"})),
                change(ChangeType::AddPhoto, "AST-001", json!({})),
            ],
        )
        .await
        .unwrap();

    assert_eq!(batch.session.total_changes, 3);
    assert_eq!(batch.session.device_id, DEVICE);
    assert!(!batch.session.is_complete);

    let stored = OfflineChangeRepo::list_by_session(&pool, batch.session.id)
        .await
        .unwrap();
    let order: Vec<_> = stored.iter().map(|c| c.change_type.as_str()).collect();
    assert_eq!(order, ["inventory_scan", "status_change", "add_photo"]);
    assert!(stored.iter().all(|c| c.sync_state == "pending"));
    assert!(stored.iter().all(|c| c.attempt_count == 0));
    assert_eq!(
        stored.iter().map(|c| c.batch_position).collect::<Vec<_>>(),
        [0, 1, 2]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_batches_store_nothing(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));
    let p = principal(&ana);

    let err = engine.submit_batch(&p, DEVICE, Vec::new()).await.unwrap_err();
    assert_matches!(err, SyncError::Validation(_));

    let err = engine
        .submit_batch(&p, "  ", vec![change(ChangeType::AddPhoto, "AST-001", json!({}))])
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Validation(_));

    let mut old = change(ChangeType::AddPhoto, "AST-001", json!({}));
    old.local_timestamp = Utc::now() - Duration::days(45);
    let err = engine
        .submit_batch(
            &p,
            DEVICE,
            vec![change(ChangeType::AddPhoto, "AST-001", json!({})), old],
        )
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Validation(msg) if msg.starts_with("change 1"));

    let err = engine
        .submit_batch(&p, DEVICE, vec![change(ChangeType::Update, "", json!({"brand": "HP"}))])
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Validation(_));

    let err = engine
        .submit_batch(&p, DEVICE, vec![change(ChangeType::Update, "AST-001", json!([1, 2]))])
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Validation(_));

    assert_eq!(session_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_changes_need_no_target(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let batch = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(ChangeType::Create, "", json!({"asset_code": "AST-900"}))],
        )
        .await
        .unwrap();
    assert_eq!(batch.changes.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_roles_without_mobile_sync_cannot_submit(pool: PgPool) {
    let auditor = seed_user(&pool, "olga", "auditor").await;
    let reader = seed_user(&pool, "raul", "read_only").await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    for user in [&auditor, &reader] {
        let err = engine
            .submit_batch(
                &principal(user),
                DEVICE,
                vec![change(ChangeType::AddPhoto, "AST-001", json!({}))],
            )
            .await
            .unwrap_err();
        assert_matches!(err, SyncError::PermissionDenied(_));
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_changes_lists_pending_and_failed(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let luis = seed_user(&pool, "luis", "staff").await;
    seed_registry(&pool, ana.id).await;
    let engine = engine(&pool, Arc::new(RecordingNotifier::default()));

    let failing = engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(ChangeType::StatusChange, "AST-001", json!({}))],
        )
        .await
        .unwrap();
    engine.process_session(failing.session.id).await.unwrap();

    engine
        .submit_batch(
            &principal(&ana),
            DEVICE,
            vec![change(ChangeType::AddPhoto, "AST-001", json!({}))],
        )
        .await
        .unwrap();
    engine
        .submit_batch(
            &principal(&luis),
            DEVICE,
            vec![change(ChangeType::AddPhoto, "AST-001", json!({}))],
        )
        .await
        .unwrap();

    let pending = engine.pending_changes(&principal(&ana)).await.unwrap();
    let states: Vec<_> = pending.iter().map(|c| c.sync_state.as_str()).collect();
    assert_eq!(states, ["error", "pending"]);
    assert!(pending.iter().all(|c| c.user_id == ana.id));
}
