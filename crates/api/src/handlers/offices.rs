//! Handlers for the `/offices` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use patrimonio_core::entity::{EntityKind, EntityRef};
use patrimonio_core::error::CoreError;
use patrimonio_core::types::DbId;
use patrimonio_db::models::office::{CreateOffice, Office, UpdateOffice};
use patrimonio_db::models::recycle_bin::RecycleBinEntry;
use patrimonio_db::repositories::OfficeRepo;
use patrimonio_lifecycle::{records, soft_delete};

use super::{deletion_reason, DeleteRequest, ModeQuery};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireActive, RequireEditor};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/offices
pub async fn list_offices(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Query(params): Query<ModeQuery>,
) -> AppResult<Json<DataResponse<Vec<Office>>>> {
    let mode = params.resolve(&user.principal)?;
    let offices = OfficeRepo::list(&state.pool, mode).await?;
    Ok(Json(DataResponse { data: offices }))
}

/// GET /api/v1/offices/{id}
pub async fn get_office(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<ModeQuery>,
) -> AppResult<Json<DataResponse<Office>>> {
    let mode = params.resolve(&user.principal)?;
    let office = OfficeRepo::find_by_id(&state.pool, id, mode)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Office",
            id,
        }))?;
    Ok(Json(DataResponse { data: office }))
}

/// POST /api/v1/offices
pub async fn create_office(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Json(input): Json<CreateOffice>,
) -> AppResult<(StatusCode, Json<DataResponse<Office>>)> {
    let office = records::create_office(&state.pool, input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: office })))
}

/// PUT /api/v1/offices/{id}
pub async fn update_office(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateOffice>,
) -> AppResult<Json<DataResponse<Office>>> {
    let office = records::update_office(&state.pool, id, input, user.id()).await?;
    Ok(Json(DataResponse { data: office }))
}

/// DELETE /api/v1/offices/{id}
///
/// Soft delete. Refused with 409 while the office still has active assets.
pub async fn delete_office(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<DeleteRequest>>,
) -> AppResult<Json<DataResponse<RecycleBinEntry>>> {
    let reason = deletion_reason(body);
    let entry = soft_delete::soft_delete(
        &state.pool,
        &state.event_bus,
        EntityRef::new(EntityKind::Office, id),
        user.id(),
        &reason,
    )
    .await?;
    Ok(Json(DataResponse { data: entry }))
}
