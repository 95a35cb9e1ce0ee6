//! Handlers for the `/retention` resource (per-module retention settings).

use axum::extract::{Path, State};
use axum::Json;
use patrimonio_db::models::retention_config::{RetentionConfig, UpdateRetentionConfig};
use patrimonio_lifecycle::ledger::{self, RetentionSettings};

use crate::error::AppResult;
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/retention
///
/// Effective settings for every module, defaults filled in.
pub async fn list_settings(
    user: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<RetentionSettings>>>> {
    let settings = ledger::list_retention_settings(&state.pool, &user.principal).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// GET /api/v1/retention/{module}
pub async fn get_settings(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(module): Path<String>,
) -> AppResult<Json<DataResponse<RetentionSettings>>> {
    let settings = ledger::get_retention_settings(&state.pool, &user.principal, &module).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/retention/{module}
///
/// Administrator only. Entries already in the bin keep their deadline.
pub async fn update_settings(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(module): Path<String>,
    Json(update): Json<UpdateRetentionConfig>,
) -> AppResult<Json<DataResponse<RetentionConfig>>> {
    let saved =
        ledger::update_retention_settings(&state.pool, &user.principal, &module, &update).await?;
    Ok(Json(DataResponse { data: saved }))
}
