//! Shared fixtures and request helpers for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use patrimonio_api::auth::jwt::{generate_access_token, JwtConfig};
use patrimonio_api::config::ServerConfig;
use patrimonio_api::router::build_app_router;
use patrimonio_api::state::AppState;
use patrimonio_core::security::SecurityCode;
use patrimonio_core::types::DbId;
use patrimonio_db::models::asset::{Asset, CreateAsset};
use patrimonio_db::models::catalog::{CatalogItem, CreateCatalogItem};
use patrimonio_db::models::office::{CreateOffice, Office};
use patrimonio_db::models::user::{CreateUser, User};
use patrimonio_db::repositories::UserRepo;
use patrimonio_events::{DbNotifier, EventBus, Notifier};
use patrimonio_lifecycle::records;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Permanent-delete code configured by [`test_config`].
pub const PURGE_CODE: &str = "PURGE-2026";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        permanent_delete_code: SecurityCode::new(Some(PURGE_CODE.to_string())),
    }
}

/// Build the full application router over `pool`, with the production
/// middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());
    let notifier: Arc<dyn Notifier> = Arc::new(DbNotifier::new(pool.clone()));
    let state = AppState::new(pool, config.clone(), event_bus, notifier);
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

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

/// A valid bearer token for `user`.
pub fn token_for(user: &User) -> String {
    generate_access_token(user.id, &user.role, &test_config().jwt).unwrap()
}

/// An office, a catalog item and one asset (`AST-001`).
pub struct Registry {
    pub office: Office,
    pub item: CatalogItem,
    pub asset: Asset,
}

pub async fn seed_office(pool: &PgPool, code: &str, user_id: DbId) -> Office {
    records::create_office(
        pool,
        CreateOffice {
            code: code.to_string(),
            name: format!("Oficina {code}"),
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
    .unwrap()
}

pub async fn seed_registry(pool: &PgPool, user_id: DbId) -> Registry {
    let office = seed_office(pool, "OF-ALM", user_id).await;
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

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Unauthenticated GET.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn delete_json(app: Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), Some(body)).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
