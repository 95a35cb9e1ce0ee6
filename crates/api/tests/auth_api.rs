//! Authentication and role checks at the HTTP boundary.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, get_auth, post_json, seed_user, token_for};
use patrimonio_db::repositories::UserRepo;
use serde_json::json;
use sqlx::PgPool;

fn new_office(code: &str) -> serde_json::Value {
    json!({ "code": code, "name": "Logistica", "responsible": "M. Quispe" })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_token_is_unauthorized(pool: PgPool) {
    let response = get(build_test_app(pool), "/api/v1/offices").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_garbage_token_is_unauthorized(pool: PgPool) {
    let response = get_auth(build_test_app(pool), "/api/v1/offices", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_token_for_unknown_user_is_unauthorized(pool: PgPool) {
    let ghost = seed_user(&pool, "ghost", "staff").await;
    let token = token_for(&ghost);
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(ghost.id)
        .execute(&pool)
        .await
        .unwrap();

    let response = get_auth(build_test_app(pool), "/api/v1/offices", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_read_only_can_list_but_not_edit(pool: PgPool) {
    let reader = seed_user(&pool, "raul", "read_only").await;
    let token = token_for(&reader);

    let response = get_auth(build_test_app(pool.clone()), "/api/v1/offices", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/offices",
        &token,
        new_office("OF-LOG"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Deleted rows are recycle-bin material.
    let response = get_auth(build_test_app(pool), "/api/v1/offices?mode=deleted", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deactivation_takes_effect_on_the_next_request(pool: PgPool) {
    let ana = seed_user(&pool, "ana", "staff").await;
    let token = token_for(&ana);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/offices",
        &token,
        new_office("OF-LOG"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    UserRepo::set_active(&pool, ana.id, false).await.unwrap();

    let response = get_auth(build_test_app(pool.clone()), "/api/v1/offices", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(build_test_app(pool), "/api/v1/recycle-bin", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
