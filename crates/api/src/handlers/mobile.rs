//! Handlers for the `/mobile` resource (offline sync).
//!
//! Submission is synchronous and all-or-nothing; replay runs on a spawned
//! task so devices get their session id back immediately and poll
//! `GET /mobile/sync/{session_id}` for the outcome.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use patrimonio_core::asset::Condition;
use patrimonio_core::entity::QueryMode;
use patrimonio_core::permissions::Capability;
use patrimonio_core::sync::{Resolution, SyncState};
use patrimonio_core::types::DbId;
use patrimonio_db::models::asset::Asset;
use patrimonio_db::models::status_history::StatusHistory;
use patrimonio_db::models::sync::{OfflineChange, SubmittedChange};
use patrimonio_db::repositories::{
    AssetRepo, CatalogItemRepo, OfficeRepo, OfflineChangeRepo, StatusHistoryRepo,
};
use patrimonio_lifecycle::records::{self, InventoryReport, QuickInventory};
use patrimonio_sync::{ResolvedConflict, SessionStatus, SubmittedBatch, SyncEngine};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::middleware::rbac::RequireActive;
use crate::response::DataResponse;
use crate::state::AppState;

/// History rows shown with a scanned asset.
const SCAN_HISTORY_LIMIT: usize = 5;

/// Window for the dashboard's recent-activity count.
const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Conditions that call for a follow-up (bad, e-waste, scrap).
const ATTENTION_CONDITIONS: [Condition; 3] =
    [Condition::Bad, Condition::ElectronicWaste, Condition::Scrap];

/// Body of `POST /mobile/sync`.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub device_id: String,
    pub changes: Vec<SubmittedChange>,
}

/// Body of `POST /mobile/sync/retry`.
#[derive(Debug, Deserialize)]
pub struct RetryRequest {
    pub device_id: String,
}

/// Body of `POST /mobile/conflicts/{id}/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resolution: Resolution,
    pub manual_payload: Option<serde_json::Value>,
}

/// Response of `GET /mobile/scan/{qr_code}`.
#[derive(Debug, Serialize)]
pub struct ScanView {
    pub asset: Asset,
    pub catalog_denomination: Option<String>,
    pub office_code: Option<String>,
    pub office_name: Option<String>,
    /// Newest first.
    pub recent_history: Vec<StatusHistory>,
    pub can_edit: bool,
    pub can_record_condition: bool,
}

#[derive(Debug, Serialize)]
pub struct ConditionCount {
    pub condition: String,
    pub label: Option<&'static str>,
    pub count: i64,
}

/// The caller's own offline queue.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub pending: i64,
    pub errors: i64,
    pub conflicts: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardUser {
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub can_edit: bool,
}

/// Response of `GET /mobile/dashboard`.
#[derive(Debug, Serialize)]
pub struct MobileDashboard {
    pub total_assets: i64,
    pub by_condition: Vec<ConditionCount>,
    pub recent_activity: i64,
    pub needs_attention: i64,
    pub sync: SyncSummary,
    pub user: DashboardUser,
}

// ── Background replay ────────────────────────────────────────────────────

fn spawn_session(engine: SyncEngine, session_id: DbId) {
    tokio::spawn(async move {
        if let Err(e) = engine.process_session(session_id).await {
            tracing::error!(session_id, error = %e, "Sync session processing failed");
        }
    });
}

fn spawn_replay(engine: SyncEngine, change_id: DbId) {
    tokio::spawn(async move {
        match engine.replay_change(change_id).await {
            Ok(outcome) => {
                tracing::debug!(change_id, ?outcome, "Resolved change replayed");
            }
            Err(e) => {
                tracing::error!(change_id, error = %e, "Replay of resolved change failed");
            }
        }
    });
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// POST /api/v1/mobile/sync
///
/// Stores the batch in one transaction and answers 202 with the session and
/// its queued changes. Any invalid change rejects the whole batch.
pub async fn submit(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<SyncRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmittedBatch>>)> {
    let batch = state
        .sync
        .submit_batch(&user.principal, &body.device_id, body.changes)
        .await?;
    spawn_session(state.sync.clone(), batch.session.id);
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: batch })))
}

/// GET /api/v1/mobile/sync/{session_id}
pub async fn session_status(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<DataResponse<SessionStatus>>> {
    let status = state
        .sync
        .session_status(&user.principal, session_id)
        .await?;
    Ok(Json(DataResponse { data: status }))
}

/// GET /api/v1/mobile/changes/pending
///
/// The caller's changes still waiting for replay or stuck in error.
pub async fn pending_changes(
    user: CurrentUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<OfflineChange>>>> {
    let changes = state.sync.pending_changes(&user.principal).await?;
    Ok(Json(DataResponse { data: changes }))
}

/// POST /api/v1/mobile/conflicts/{id}/resolve
///
/// `keep_client` and `manual` put the change back in the queue; it is
/// replayed in the background without the staleness check.
pub async fn resolve_conflict(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(conflict_id): Path<DbId>,
    Json(body): Json<ResolveRequest>,
) -> AppResult<Json<DataResponse<ResolvedConflict>>> {
    let resolved = state
        .sync
        .resolve_conflict(
            &user.principal,
            conflict_id,
            body.resolution,
            body.manual_payload,
        )
        .await?;
    if resolved.needs_replay() {
        spawn_replay(state.sync.clone(), resolved.change.id);
    }
    Ok(Json(DataResponse { data: resolved }))
}

/// POST /api/v1/mobile/sync/retry
///
/// Moves the device's failed changes into a new session. Answers 202 with
/// the session when something was queued, 200 with `null` otherwise.
pub async fn retry(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(body): Json<RetryRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Option<SubmittedBatch>>>)> {
    let batch = state
        .sync
        .retry_failed(&user.principal, &body.device_id)
        .await?;
    let status = match &batch {
        Some(batch) => {
            spawn_session(state.sync.clone(), batch.session.id);
            StatusCode::ACCEPTED
        }
        None => StatusCode::OK,
    };
    Ok((status, Json(DataResponse { data: batch })))
}

// ── Field tools ──────────────────────────────────────────────────────────

/// GET /api/v1/mobile/scan/{qr_code}
///
/// Resolves a scanned label to an active asset with its latest history.
pub async fn scan(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Path(qr_code): Path<String>,
) -> AppResult<Json<DataResponse<ScanView>>> {
    let asset = AssetRepo::find_by_qr_code(&state.pool, qr_code.trim(), QueryMode::Active)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No active asset has QR code '{qr_code}'")))?;
    let catalog_item =
        CatalogItemRepo::find_by_id(&state.pool, asset.catalog_item_id, QueryMode::All).await?;
    let office = OfficeRepo::find_by_id(&state.pool, asset.office_id, QueryMode::All).await?;
    let mut recent_history =
        StatusHistoryRepo::list_by_asset(&state.pool, asset.id, QueryMode::Active).await?;
    recent_history.truncate(SCAN_HISTORY_LIMIT);

    let view = ScanView {
        catalog_denomination: catalog_item.map(|item| item.denomination),
        office_code: office.as_ref().map(|o| o.code.clone()),
        office_name: office.map(|o| o.name),
        recent_history,
        can_edit: user.principal.can(Capability::EditRecords),
        can_record_condition: user.principal.can(Capability::MobileSync),
        asset,
    };
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/mobile/inventory
///
/// Records a history row with the condition unchanged for every scanned
/// label. Unknown codes are reported per item.
pub async fn quick_inventory(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
    Json(body): Json<QuickInventory>,
) -> AppResult<Json<DataResponse<InventoryReport>>> {
    user.principal.require(Capability::MobileSync)?;
    let report = records::quick_inventory(&state.pool, body, user.id()).await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/mobile/dashboard
///
/// Registry totals plus the caller's own sync queue.
pub async fn dashboard(
    RequireActive(user): RequireActive,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MobileDashboard>>> {
    let counts = AssetRepo::count_by_condition(&state.pool).await?;
    let total_assets: i64 = counts.iter().map(|(_, n)| n).sum();
    let needs_attention: i64 = counts
        .iter()
        .filter(|(code, _)| ATTENTION_CONDITIONS.iter().any(|c| c.code() == code.as_str()))
        .map(|(_, n)| n)
        .sum();
    let by_condition = counts
        .into_iter()
        .map(|(condition, count)| ConditionCount {
            label: Condition::parse(&condition).ok().map(Condition::label),
            condition,
            count,
        })
        .collect();

    let since = Utc::now() - Duration::days(RECENT_ACTIVITY_DAYS);
    let recent_activity = StatusHistoryRepo::count_since(&state.pool, since).await?;

    let user_id = user.id();
    let sync = SyncSummary {
        pending: OfflineChangeRepo::count_in_state(&state.pool, user_id, SyncState::Pending)
            .await?,
        errors: OfflineChangeRepo::count_in_state(&state.pool, user_id, SyncState::Error).await?,
        conflicts: OfflineChangeRepo::count_in_state(&state.pool, user_id, SyncState::Conflict)
            .await?,
    };

    let dashboard = MobileDashboard {
        total_assets,
        by_condition,
        recent_activity,
        needs_attention,
        sync,
        user: DashboardUser {
            can_edit: user.principal.can(Capability::EditRecords),
            username: user.user.username,
            full_name: user.user.full_name,
            role: user.user.role,
        },
    };
    Ok(Json(DataResponse { data: dashboard }))
}
