//! Handlers for the `/recycle-bin` resource.
//!
//! Every operation goes through the ledger service, which enforces the
//! caller's capabilities and scope. Handlers only translate parameters.

use axum::extract::{Path, Query, State};
use axum::Json;
use patrimonio_core::entity::EntityKind;
use patrimonio_core::permissions::LedgerScope;
use patrimonio_core::recycle_bin::StateFilter;
use patrimonio_core::types::{DbId, Timestamp};
use patrimonio_db::models::deletion_audit::{AuditLogFilter, DeletionAuditLog};
use patrimonio_db::models::recycle_bin::{RecycleBinEntry, RecycleBinStats};
use patrimonio_lifecycle::ledger::{
    self, BulkReport, EntryPage, EntryQuery, EntryView, PurgeSummary,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum number of ids accepted by one bulk request.
const MAX_BULK_IDS: usize = 100;

/// Maximum page size for ledger and audit listings.
const MAX_LIMIT: i64 = 200;

/// Default page size for ledger and audit listings.
const DEFAULT_LIMIT: i64 = 50;

// ---------------------------------------------------------------------------
// Query / request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /recycle-bin`.
#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    /// `own` or `all`; defaults to the widest scope the caller holds.
    pub scope: Option<String>,
    pub module: Option<String>,
    /// Entity kind tag, e.g. `asset` or `status_history`.
    pub kind: Option<String>,
    /// `pending` (default), `restored` or `all`.
    pub state: Option<String>,
    /// Matches the object representation or the deletion reason.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl EntryListQuery {
    fn into_entry_query(self) -> AppResult<EntryQuery> {
        let scope = self
            .scope
            .as_deref()
            .map(LedgerScope::parse)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let entity_kind = self
            .kind
            .as_deref()
            .map(EntityKind::parse)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let state = self
            .state
            .as_deref()
            .map(StateFilter::parse)
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or_default();

        Ok(EntryQuery {
            scope,
            module_name: self.module,
            entity_kind,
            state,
            search: self.search,
            limit: Some(clamp_limit(self.limit)),
            offset: Some(self.offset.unwrap_or(0).max(0)),
        })
    }
}

/// Query parameters for `GET /recycle-bin/audit`.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub module: Option<String>,
    pub user_id: Option<DbId>,
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of the bulk endpoints.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<DbId>,
}

/// Body for `DELETE /recycle-bin/{id}`.
#[derive(Debug, Deserialize)]
pub struct PermanentDeleteRequest {
    pub security_code: String,
}

/// Body for `POST /recycle-bin/bulk-delete`.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<DbId>,
    pub security_code: String,
}

fn validated_ids(ids: &[DbId]) -> AppResult<&[DbId]> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".into()));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_BULK_IDS} ids may be processed at once"
        )));
    }
    Ok(ids)
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/recycle-bin
pub async fn list_entries(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<EntryListQuery>,
) -> AppResult<Json<DataResponse<EntryPage>>> {
    let query = params.into_entry_query()?;
    let page = ledger::list_entries(&state.pool, &user.principal, query).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/recycle-bin/{id}
pub async fn get_entry(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(entry_id): Path<DbId>,
) -> AppResult<Json<DataResponse<EntryView>>> {
    let entry = ledger::get_entry(&state.pool, &user.principal, entry_id).await?;
    Ok(Json(DataResponse { data: entry }))
}

/// GET /api/v1/recycle-bin/stats
pub async fn statistics(
    user: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<RecycleBinStats>>> {
    let stats = ledger::statistics(&state.pool, &user.principal).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/recycle-bin/audit
pub async fn audit_logs(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<Vec<DeletionAuditLog>>>> {
    let filter = AuditLogFilter {
        action: params.action,
        module_name: params.module,
        user_id: params.user_id,
        since: params.since,
        until: params.until,
        limit: Some(clamp_limit(params.limit)),
        offset: Some(params.offset.unwrap_or(0).max(0)),
    };
    let logs = ledger::list_audit_logs(&state.pool, &user.principal, filter).await?;
    Ok(Json(DataResponse { data: logs }))
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// POST /api/v1/recycle-bin/{id}/restore
///
/// Returns 409 when the entry was already restored. Only the record itself
/// comes back; a parent that is still deleted stays in the recycle bin.
pub async fn restore(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(entry_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RecycleBinEntry>>> {
    let entry =
        ledger::restore_entry(&state.pool, &state.event_bus, &user.principal, entry_id).await?;
    Ok(Json(DataResponse { data: entry }))
}

/// POST /api/v1/recycle-bin/bulk-restore
///
/// Items succeed or fail independently; the report lists each outcome.
pub async fn bulk_restore(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<BulkRequest>,
) -> AppResult<Json<DataResponse<BulkReport>>> {
    let ids = validated_ids(&body.ids)?;
    let report = ledger::bulk_restore(&state.pool, &state.event_bus, &user.principal, ids).await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Permanent delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/recycle-bin/{id}
///
/// Administrator only, with the configured security code in the body.
/// Physically removes the record and its entry. A wrong code is 403 and
/// repeated failures are 429.
pub async fn permanent_delete(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(entry_id): Path<DbId>,
    Json(body): Json<PermanentDeleteRequest>,
) -> AppResult<Json<DataResponse<PurgeSummary>>> {
    let summary = ledger::permanent_delete(
        &state.pool,
        &state.event_bus,
        &user.principal,
        &state.config.permanent_delete_code,
        &body.security_code,
        entry_id,
    )
    .await?;
    Ok(Json(DataResponse { data: summary }))
}

/// POST /api/v1/recycle-bin/bulk-delete
///
/// One security-code check covers every id in the request.
pub async fn bulk_permanent_delete(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<BulkDeleteRequest>,
) -> AppResult<Json<DataResponse<BulkReport>>> {
    let ids = validated_ids(&body.ids)?;
    let report = ledger::bulk_permanent_delete(
        &state.pool,
        &state.event_bus,
        &user.principal,
        &state.config.permanent_delete_code,
        &body.security_code,
        ids,
    )
    .await?;
    Ok(Json(DataResponse { data: report }))
}
