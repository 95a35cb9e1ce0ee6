//! Shared fixtures for lifecycle integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use patrimonio_core::permissions::Principal;
use patrimonio_core::security::SecurityCode;
use patrimonio_core::types::DbId;
use patrimonio_db::models::asset::{Asset, CreateAsset};
use patrimonio_db::models::catalog::{CatalogItem, CreateCatalogItem};
use patrimonio_db::models::office::{CreateOffice, Office};
use patrimonio_db::models::user::{CreateUser, User};
use patrimonio_db::repositories::UserRepo;
use patrimonio_events::{NotificationMessage, Notifier, NotifyError};
use patrimonio_lifecycle::records;
use sqlx::PgPool;

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

/// The code configured for permanent deletes in these tests.
pub const PURGE_CODE: &str = "PURGE-2026";

pub fn security_code() -> SecurityCode {
    SecurityCode::new(Some(PURGE_CODE.to_string()))
}

pub fn principal(user: &User) -> Principal {
    user.principal().unwrap()
}

pub fn new_office(code: &str) -> CreateOffice {
    CreateOffice {
        code: code.to_string(),
        name: format!("Oficina {code}"),
        description: None,
        responsible: "M. Quispe".to_string(),
        position: None,
        phone: None,
        email: None,
        location: None,
    }
}

pub fn new_catalog_item(code: &str) -> CreateCatalogItem {
    CreateCatalogItem {
        code: code.to_string(),
        denomination: "computadora personal portatil".to_string(),
        group_name: None,
        class_name: None,
        resolution: None,
        status: None,
    }
}

pub async fn seed_office(pool: &PgPool, code: &str, user_id: DbId) -> Office {
    records::create_office(pool, new_office(code), user_id)
        .await
        .unwrap()
}

pub async fn seed_catalog_item(pool: &PgPool, code: &str, user_id: DbId) -> CatalogItem {
    records::create_catalog_item(pool, new_catalog_item(code), user_id)
        .await
        .unwrap()
}

pub async fn seed_asset(
    pool: &PgPool,
    asset_code: &str,
    catalog_item_id: DbId,
    office_id: DbId,
    user_id: DbId,
) -> Asset {
    records::create_asset(
        pool,
        CreateAsset {
            asset_code: asset_code.to_string(),
            catalog_item_id,
            office_id,
            brand: Some("Lenovo".to_string()),
            model: Some("T14".to_string()),
            ..Default::default()
        },
        user_id,
    )
    .await
    .unwrap()
}

/// An office, a catalog item and one asset using both.
pub struct Registry {
    pub office: Office,
    pub item: CatalogItem,
    pub asset: Asset,
}

pub async fn seed_registry(pool: &PgPool, user_id: DbId) -> Registry {
    let office = seed_office(pool, "OF-LOG", user_id).await;
    let item = seed_catalog_item(pool, "74089950", user_id).await;
    let asset = seed_asset(pool, "AST-001", item.id, office.id, user_id).await;
    Registry {
        office,
        item,
        asset,
    }
}

/// Move every pending entry's deadline into the past.
pub async fn expire_all_entries(pool: &PgPool) {
    sqlx::query(
        "UPDATE recycle_bin_entries SET auto_delete_at = NOW() - INTERVAL '1 minute' \
         WHERE restored_at IS NULL",
    )
    .execute(pool)
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Notifiers
// ---------------------------------------------------------------------------

/// Records every message instead of delivering it.
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

/// Rejects every message.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _user_id: DbId, _message: &NotificationMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected("mailbox unavailable".to_string()))
    }
}
