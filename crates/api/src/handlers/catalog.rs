//! Handlers for the `/catalog` resource (the national goods catalog).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use patrimonio_core::entity::{EntityKind, EntityRef};
use patrimonio_core::error::CoreError;
use patrimonio_core::types::DbId;
use patrimonio_db::models::catalog::{CatalogItem, CreateCatalogItem, UpdateCatalogItem};
use patrimonio_db::models::recycle_bin::RecycleBinEntry;
use patrimonio_db::repositories::CatalogItemRepo;
use patrimonio_lifecycle::{records, soft_delete};

use super::{deletion_reason, DeleteRequest, ModeQuery};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireActive, RequireEditor};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/catalog
pub async fn list_items(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Query(params): Query<ModeQuery>,
) -> AppResult<Json<DataResponse<Vec<CatalogItem>>>> {
    let mode = params.resolve(&user.principal)?;
    let items = CatalogItemRepo::list(&state.pool, mode).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/catalog/{id}
pub async fn get_item(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ModeQuery>,
) -> AppResult<Json<DataResponse<CatalogItem>>> {
    let mode = params.resolve(&user.principal)?;
    let item = CatalogItemRepo::find_by_id(&state.pool, id, mode)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "CatalogItem",
            id,
        }))?;
    Ok(Json(DataResponse { data: item }))
}

/// POST /api/v1/catalog
pub async fn create_item(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Json(input): Json<CreateCatalogItem>,
) -> AppResult<(StatusCode, Json<DataResponse<CatalogItem>>)> {
    let item = records::create_catalog_item(&state.pool, input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// PUT /api/v1/catalog/{id}
pub async fn update_item(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCatalogItem>,
) -> AppResult<Json<DataResponse<CatalogItem>>> {
    let item = records::update_catalog_item(&state.pool, id, input, user.id()).await?;
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/catalog/{id}
///
/// Soft delete. Refused with 409 while active assets reference the item.
pub async fn delete_item(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<DeleteRequest>>,
) -> AppResult<Json<DataResponse<RecycleBinEntry>>> {
    let reason = deletion_reason(body);
    let entry = soft_delete::soft_delete(
        &state.pool,
        &state.event_bus,
        EntityRef::new(EntityKind::CatalogItem, id),
        user.id(),
        &reason,
    )
    .await?;
    Ok(Json(DataResponse { data: entry }))
}
