//! Handlers for the `/assets` resource and its nested history and
//! movement endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use patrimonio_core::error::CoreError;
use patrimonio_core::types::DbId;
use patrimonio_db::models::asset::{Asset, CreateAsset, UpdateAsset};
use patrimonio_db::models::movement::{CreateMovement, Movement};
use patrimonio_db::models::status_history::StatusHistory;
use patrimonio_db::repositories::{AssetRepo, MovementRepo};
use patrimonio_lifecycle::records::{self, StatusChange};
use patrimonio_lifecycle::soft_delete::{self, CascadeReport};
use serde::Deserialize;

use super::{deletion_reason, DeleteRequest, ModeQuery};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireActive, RequireEditor};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /assets`.
#[derive(Debug, Deserialize)]
pub struct AssetListQuery {
    pub office_id: Option<DbId>,
    pub mode: Option<String>,
}

fn asset_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Asset", id })
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// GET /api/v1/assets
pub async fn list_assets(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Query(params): Query<AssetListQuery>,
) -> AppResult<Json<DataResponse<Vec<Asset>>>> {
    let mode = ModeQuery { mode: params.mode }.resolve(&user.principal)?;
    let assets = AssetRepo::list(&state.pool, params.office_id, mode).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// GET /api/v1/assets/{id}
pub async fn get_asset(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ModeQuery>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let mode = params.resolve(&user.principal)?;
    let asset = AssetRepo::find_by_id(&state.pool, id, mode)
        .await?
        .ok_or_else(|| asset_not_found(id))?;
    Ok(Json(DataResponse { data: asset }))
}

/// POST /api/v1/assets
///
/// The QR code is generated when the body omits one.
pub async fn create_asset(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Json(input): Json<CreateAsset>,
) -> AppResult<(StatusCode, Json<DataResponse<Asset>>)> {
    let asset = records::create_asset(&state.pool, input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// PUT /api/v1/assets/{id}
pub async fn update_asset(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAsset>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let asset = records::update_asset(&state.pool, id, input, user.id()).await?;
    Ok(Json(DataResponse { data: asset }))
}

/// DELETE /api/v1/assets/{id}
///
/// Cascade soft delete: the asset, its active movements and its condition
/// history each get their own recycle-bin entry. Refused with 409 and the
/// blocking movement ids while any movement is unconfirmed.
pub async fn delete_asset(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<DeleteRequest>>,
) -> AppResult<Json<DataResponse<CascadeReport>>> {
    let reason = deletion_reason(body);
    let report =
        soft_delete::soft_delete_cascade(&state.pool, &state.event_bus, id, user.id(), &reason)
            .await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Condition history
// ---------------------------------------------------------------------------

/// GET /api/v1/assets/{id}/history
///
/// Full condition history, soft-deleted rows included.
pub async fn history(
    RequireActive(_user): RequireActive,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<StatusHistory>>>> {
    let rows = records::asset_history(&state.pool, id).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// POST /api/v1/assets/{id}/status
pub async fn change_status(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<StatusChange>,
) -> AppResult<(StatusCode, Json<DataResponse<StatusHistory>>)> {
    let row = records::change_status(&state.pool, id, input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

/// GET /api/v1/assets/{id}/movements
pub async fn list_movements(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ModeQuery>,
) -> AppResult<Json<DataResponse<Vec<Movement>>>> {
    let mode = params.resolve(&user.principal)?;
    let movements = MovementRepo::list_by_asset(&state.pool, id, mode).await?;
    Ok(Json(DataResponse { data: movements }))
}

/// POST /api/v1/assets/{id}/movements
///
/// Starts an unconfirmed transfer to another office.
pub async fn create_movement(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateMovement>,
) -> AppResult<(StatusCode, Json<DataResponse<Movement>>)> {
    let movement = records::create_movement(&state.pool, id, input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: movement })))
}
