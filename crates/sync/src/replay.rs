//! Applying one offline change to the registry.
//!
//! [`apply_change`] runs inside the caller's transaction and never commits.
//! It returns [`Applied::Conflict`] for situations the user must decide on;
//! an `Err` means the change itself is broken and ends in the error state.

use patrimonio_core::asset::Condition;
use patrimonio_core::entity::QueryMode;
use patrimonio_core::sync::{is_stale, strip_protected_fields, ChangeType, ConflictKind};
use patrimonio_core::types::DbId;
use patrimonio_db::models::asset::{Asset, CreateAsset, UpdateAsset};
use patrimonio_db::models::sync::OfflineChange;
use patrimonio_db::repositories::{AssetRepo, OfflineChangeRepo};
use patrimonio_lifecycle::records::{
    create_asset_in, ensure_active_parents, record_condition_in, update_asset_in,
};
use patrimonio_lifecycle::LifecycleError;
use serde_json::{json, Map, Value};
use sqlx::PgConnection;

use crate::error::SyncError;

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

const PHOTO_OBSERVATION: &str = "Photo added from mobile device";
const SCAN_OBSERVATION: &str = "Inventory scan from mobile device";

/// A conflict detected during replay, not yet persisted.
#[derive(Debug, Clone)]
pub(crate) struct DetectedConflict {
    pub kind: ConflictKind,
    pub server_snapshot: Value,
    pub detail: String,
}

#[derive(Debug)]
pub(crate) enum Applied {
    /// Applied. `written_asset_id` names the asset row the change wrote.
    Done { written_asset_id: Option<DbId> },
    Conflict(DetectedConflict),
}

fn conflict(kind: ConflictKind, server_snapshot: Value, detail: impl Into<String>) -> Applied {
    Applied::Conflict(DetectedConflict {
        kind,
        server_snapshot,
        detail: detail.into(),
    })
}

fn snapshot(asset: &Asset) -> Result<Value, SyncError> {
    serde_json::to_value(asset).map_err(|e| SyncError::Internal(e.to_string()))
}

fn is_unique_violation(err: &LifecycleError) -> bool {
    matches!(
        err,
        LifecycleError::Database(sqlx::Error::Database(db_err))
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

/// Parent problems a device cannot see offline become data conflicts.
fn is_parent_problem(err: &LifecycleError) -> bool {
    matches!(
        err,
        LifecycleError::InactiveParent(_) | LifecycleError::NotFound { .. }
    )
}

fn payload_object(change: &OfflineChange) -> Result<&Map<String, Value>, SyncError> {
    change
        .payload
        .as_object()
        .ok_or_else(|| SyncError::InvalidPayload("payload must be a JSON object".into()))
}

fn optional_text(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Target lookup
// ---------------------------------------------------------------------------

fn scan_code(change: &OfflineChange) -> Option<&str> {
    change
        .scan_code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Find the asset a change points at: by scan code when the device sent
/// one, otherwise by business key.
async fn find_target(
    conn: &mut PgConnection,
    change: &OfflineChange,
    mode: QueryMode,
) -> Result<Option<Asset>, sqlx::Error> {
    if let Some(code) = scan_code(change) {
        return AssetRepo::find_by_qr_code(&mut *conn, code, mode).await;
    }
    if change.target_identifier.is_empty() {
        return Ok(None);
    }
    AssetRepo::find_by_asset_code(&mut *conn, &change.target_identifier, mode).await
}

/// The `target_deleted` conflict, with the soft-deleted row as snapshot
/// when it still exists.
async fn target_deleted(
    conn: &mut PgConnection,
    change: &OfflineChange,
) -> Result<Applied, SyncError> {
    let reference = scan_code(change).unwrap_or(&change.target_identifier).to_string();
    let snapshot = match find_target(conn, change, QueryMode::All).await? {
        Some(asset) => snapshot(&asset)?,
        None => json!({ "message": "The asset does not exist on the server" }),
    };
    Ok(conflict(
        ConflictKind::TargetDeleted,
        snapshot,
        format!("Asset '{reference}' is deleted or does not exist"),
    ))
}

/// Staleness, except when the asset's current version is this device's own
/// earlier write, e.g. a create followed by an update in one batch.
async fn is_stale_for(
    conn: &mut PgConnection,
    asset: &Asset,
    change: &OfflineChange,
) -> Result<bool, SyncError> {
    if !is_stale(asset.updated_at, change.local_timestamp, change.bypass_staleness) {
        return Ok(false);
    }
    let own = OfflineChangeRepo::last_write_is_own(&mut *conn, change, asset.id, asset.updated_at)
        .await?;
    Ok(!own)
}

fn target_modified(asset: &Asset, change: &OfflineChange) -> Result<Applied, SyncError> {
    Ok(conflict(
        ConflictKind::TargetModified,
        snapshot(asset)?,
        format!(
            "Asset '{}' was modified on the server at {} after the device captured it at {}",
            asset.asset_code, asset.updated_at, change.local_timestamp
        ),
    ))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub(crate) async fn apply_change(
    conn: &mut PgConnection,
    change: &OfflineChange,
) -> Result<Applied, SyncError> {
    let change_type = change.change_type().map_err(SyncError::InvalidPayload)?;
    match change_type {
        ChangeType::Create => apply_create(conn, change).await,
        ChangeType::Update => apply_update(conn, change).await,
        ChangeType::StatusChange => apply_status_change(conn, change).await,
        ChangeType::AddPhoto => apply_observation(conn, change, PHOTO_OBSERVATION).await,
        ChangeType::InventoryScan => apply_observation(conn, change, SCAN_OBSERVATION).await,
    }
}

async fn apply_create(conn: &mut PgConnection, change: &OfflineChange) -> Result<Applied, SyncError> {
    let mut fields = strip_protected_fields(payload_object(change)?);
    if !fields.contains_key("asset_code") && !change.target_identifier.is_empty() {
        fields.insert(
            "asset_code".into(),
            Value::String(change.target_identifier.clone()),
        );
    }
    let input: CreateAsset = serde_json::from_value(Value::Object(fields))
        .map_err(|e| SyncError::InvalidPayload(e.to_string()))?;

    let asset_code = input.asset_code.trim().to_string();
    if let Some(existing) =
        AssetRepo::find_by_asset_code(&mut *conn, &asset_code, QueryMode::All).await?
    {
        return Ok(conflict(
            ConflictKind::DuplicateKey,
            snapshot(&existing)?,
            format!("An asset with code '{asset_code}' already exists"),
        ));
    }

    match ensure_active_parents(conn, input.catalog_item_id, input.office_id).await {
        Ok(()) => {}
        Err(err) if is_parent_problem(&err) => {
            return Ok(conflict(
                ConflictKind::InconsistentData,
                json!({
                    "catalog_item_id": input.catalog_item_id,
                    "office_id": input.office_id,
                }),
                err.to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    match create_asset_in(conn, input, change.user_id).await {
        Ok(asset) => {
            tracing::debug!(change_id = change.id, asset_id = asset.id, "Offline create applied");
            Ok(Applied::Done {
                written_asset_id: Some(asset.id),
            })
        }
        Err(err) if is_unique_violation(&err) => Ok(conflict(
            ConflictKind::DuplicateKey,
            json!({ "asset_code": asset_code }),
            err.to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

async fn apply_update(conn: &mut PgConnection, change: &OfflineChange) -> Result<Applied, SyncError> {
    let Some(asset) = find_target(conn, change, QueryMode::Active).await? else {
        return target_deleted(conn, change).await;
    };
    if is_stale_for(conn, &asset, change).await? {
        return target_modified(&asset, change);
    }

    let fields = strip_protected_fields(payload_object(change)?);
    let input: UpdateAsset = serde_json::from_value(Value::Object(fields))
        .map_err(|e| SyncError::InvalidPayload(e.to_string()))?;

    match update_asset_in(conn, asset.id, input, change.user_id).await {
        Ok(updated) => Ok(Applied::Done {
            written_asset_id: Some(updated.id),
        }),
        Err(err) if is_parent_problem(&err) => Ok(conflict(
            ConflictKind::InconsistentData,
            snapshot(&asset)?,
            err.to_string(),
        )),
        Err(err) if is_unique_violation(&err) => Ok(conflict(
            ConflictKind::DuplicateKey,
            snapshot(&asset)?,
            err.to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

async fn apply_status_change(
    conn: &mut PgConnection,
    change: &OfflineChange,
) -> Result<Applied, SyncError> {
    let Some(asset) = find_target(conn, change, QueryMode::Active).await? else {
        return target_deleted(conn, change).await;
    };
    if is_stale_for(conn, &asset, change).await? {
        return target_modified(&asset, change);
    }

    let payload = payload_object(change)?;
    let condition = optional_text(payload, "condition")
        .ok_or_else(|| SyncError::InvalidPayload("condition is required".into()))?;
    let condition = Condition::parse(&condition).map_err(SyncError::InvalidPayload)?;
    let observations =
        optional_text(payload, "observations").or_else(|| optional_text(payload, "reason"));
    let written_asset_id = (condition.code() != asset.condition).then_some(asset.id);

    record_condition_in(
        conn,
        &asset,
        condition,
        observations,
        change.gps_location.clone(),
        change.user_id,
    )
    .await?;
    Ok(Applied::Done { written_asset_id })
}

/// Photo and scan records: a history row with the condition unchanged.
async fn apply_observation(
    conn: &mut PgConnection,
    change: &OfflineChange,
    default_observation: &str,
) -> Result<Applied, SyncError> {
    let Some(asset) = find_target(conn, change, QueryMode::Active).await? else {
        return target_deleted(conn, change).await;
    };
    let condition = Condition::parse(&asset.condition).map_err(SyncError::Internal)?;
    let observations = payload_object(change)
        .ok()
        .and_then(|p| optional_text(p, "observations"))
        .unwrap_or_else(|| default_observation.to_string());

    record_condition_in(
        conn,
        &asset,
        condition,
        Some(observations),
        change.gps_location.clone(),
        change.user_id,
    )
    .await?;
    Ok(Applied::Done {
        written_asset_id: None,
    })
}
