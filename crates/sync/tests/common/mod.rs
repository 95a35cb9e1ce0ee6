//! Shared fixtures for sync integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use patrimonio_core::permissions::Principal;
use patrimonio_core::sync::ChangeType;
use patrimonio_core::types::DbId;
use patrimonio_db::models::asset::{Asset, CreateAsset};
use patrimonio_db::models::catalog::{CatalogItem, CreateCatalogItem};
use patrimonio_db::models::office::{CreateOffice, Office};
use patrimonio_db::models::sync::SubmittedChange;
use patrimonio_db::models::user::{CreateUser, User};
use patrimonio_db::repositories::UserRepo;
use patrimonio_events::{EventBus, NotificationMessage, Notifier, NotifyError};
use patrimonio_lifecycle::records;
use patrimonio_sync::SyncEngine;
use serde_json::Value;
use sqlx::PgPool;

pub const DEVICE: &str = "tablet-07";

pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: None,
            role: role.to_string(),
        },
    )
    .await
    .unwrap()
}

pub fn principal(user: &User) -> Principal {
    user.principal().unwrap()
}

/// An office, a catalog item and one asset (`AST-001`, condition `B`).
pub struct Registry {
    pub office: Office,
    pub item: CatalogItem,
    pub asset: Asset,
}

pub async fn seed_registry(pool: &PgPool, user_id: DbId) -> Registry {
    let office = records::create_office(
        pool,
        CreateOffice {
            code: "OF-ALM".to_string(),
            name: "Almacen central".to_string(),
            description: None,
            responsible: "R. Huaman".to_string(),
            position: None,
            phone: None,
            email: None,
            location: None,
        },
        user_id,
    )
    .await
    .unwrap();
    let item = records::create_catalog_item(
        pool,
        CreateCatalogItem {
            code: "74089950".to_string(),
            denomination: "computadora personal portatil".to_string(),
            group_name: None,
            class_name: None,
            resolution: None,
            status: None,
        },
        user_id,
    )
    .await
    .unwrap();
    let asset = records::create_asset(
        pool,
        CreateAsset {
            asset_code: "AST-001".to_string(),
            catalog_item_id: item.id,
            office_id: office.id,
            brand: Some("Lenovo".to_string()),
            model: Some("T14".to_string()),
            ..Default::default()
        },
        user_id,
    )
    .await
    .unwrap();
    Registry {
        office,
        item,
        asset,
    }
}

pub fn engine(pool: &PgPool, notifier: Arc<dyn Notifier>) -> SyncEngine {
    SyncEngine::new(pool.clone(), notifier, Arc::new(EventBus::default()))
}

/// A change captured on the device just now.
pub fn change(change_type: ChangeType, target: &str, payload: Value) -> SubmittedChange {
    SubmittedChange {
        change_type,
        local_timestamp: Utc::now(),
        target_identifier: target.to_string(),
        scan_code: None,
        payload,
        gps_location: None,
    }
}

/// Same as [`change`] but captured an hour ago.
pub fn stale_change(change_type: ChangeType, target: &str, payload: Value) -> SubmittedChange {
    SubmittedChange {
        local_timestamp: Utc::now() - Duration::hours(1),
        ..change(change_type, target, payload)
    }
}

/// Move a change's capture time `minutes` into the past.
pub fn captured_ago(change: SubmittedChange, minutes: i64) -> SubmittedChange {
    SubmittedChange {
        local_timestamp: Utc::now() - Duration::minutes(minutes),
        ..change
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(DbId, NotificationMessage)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(DbId, NotificationMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: DbId, message: &NotificationMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((user_id, message.clone()));
        Ok(())
    }
}
