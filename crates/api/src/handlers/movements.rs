//! Handlers for the `/movements` resource.

use axum::extract::{Path, State};
use axum::Json;
use patrimonio_core::types::DbId;
use patrimonio_db::models::movement::Movement;
use patrimonio_lifecycle::records;

use crate::error::AppResult;
use crate::middleware::rbac::RequireEditor;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/movements/{id}/confirm
///
/// Confirms receipt and moves the asset to the destination office.
pub async fn confirm_movement(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Movement>>> {
    let movement = records::confirm_movement(&state.pool, id, user.id()).await?;
    Ok(Json(DataResponse { data: movement }))
}
