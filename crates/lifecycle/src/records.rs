//! Create/update hooks for registry records.
//!
//! Field normalisation, validation, scan-code generation and the rule that
//! an asset may only point at an active catalog item and an active office
//! all live here, so the HTTP layer and the sync engine apply them the same
//! way.

use patrimonio_core::asset::{
    generate_qr_code, normalize_denomination, normalize_office_code, normalize_plate,
    validate_catalog_code, validate_catalog_status, validate_required, Condition,
    CATALOG_STATUS_ACTIVE,
};
use patrimonio_core::entity::QueryMode;
use patrimonio_core::types::DbId;
use patrimonio_db::models::asset::{Asset, CreateAsset, UpdateAsset};
use patrimonio_db::models::catalog::{CatalogItem, CreateCatalogItem, UpdateCatalogItem};
use patrimonio_db::models::movement::{CreateMovement, Movement};
use patrimonio_db::models::office::{CreateOffice, Office, UpdateOffice};
use patrimonio_db::models::status_history::{CreateStatusHistory, StatusHistory};
use patrimonio_db::repositories::{
    AssetRepo, CatalogItemRepo, MovementRepo, OfficeRepo, StatusHistoryRepo,
};
use patrimonio_db::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::error::LifecycleError;

fn required(field: &str, value: &str) -> Result<String, LifecycleError> {
    validate_required(field, value).map_err(LifecycleError::Validation)?;
    Ok(value.trim().to_string())
}

fn required_opt(field: &str, value: Option<&String>) -> Result<Option<String>, LifecycleError> {
    value.map(|v| required(field, v)).transpose()
}

fn parse_condition(value: &str) -> Result<Condition, LifecycleError> {
    Condition::parse(value).map_err(LifecycleError::Validation)
}

// ---------------------------------------------------------------------------
// Offices
// ---------------------------------------------------------------------------

pub async fn create_office(
    pool: &DbPool,
    mut input: CreateOffice,
    user_id: DbId,
) -> Result<Office, LifecycleError> {
    validate_required("code", &input.code).map_err(LifecycleError::Validation)?;
    input.code = normalize_office_code(&input.code);
    input.name = required("name", &input.name)?;
    input.responsible = required("responsible", &input.responsible)?;

    let office = OfficeRepo::create(pool, &input, Some(user_id)).await?;
    tracing::info!(office_id = office.id, code = %office.code, user_id, "Office created");
    Ok(office)
}

pub async fn update_office(
    pool: &DbPool,
    id: DbId,
    mut input: UpdateOffice,
    user_id: DbId,
) -> Result<Office, LifecycleError> {
    if let Some(code) = &input.code {
        validate_required("code", code).map_err(LifecycleError::Validation)?;
        input.code = Some(normalize_office_code(code));
    }
    input.name = required_opt("name", input.name.as_ref())?;
    input.responsible = required_opt("responsible", input.responsible.as_ref())?;

    OfficeRepo::update(pool, id, &input, Some(user_id))
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "Office",
            id,
        })
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub async fn create_catalog_item(
    pool: &DbPool,
    mut input: CreateCatalogItem,
    user_id: DbId,
) -> Result<CatalogItem, LifecycleError> {
    input.code = input.code.trim().to_string();
    validate_catalog_code(&input.code).map_err(LifecycleError::Validation)?;
    validate_required("denomination", &input.denomination).map_err(LifecycleError::Validation)?;
    input.denomination = normalize_denomination(&input.denomination);
    if let Some(status) = &input.status {
        validate_catalog_status(status).map_err(LifecycleError::Validation)?;
    }

    let item = CatalogItemRepo::create(pool, &input, Some(user_id)).await?;
    tracing::info!(catalog_item_id = item.id, code = %item.code, user_id, "Catalog item created");
    Ok(item)
}

pub async fn update_catalog_item(
    pool: &DbPool,
    id: DbId,
    mut input: UpdateCatalogItem,
    user_id: DbId,
) -> Result<CatalogItem, LifecycleError> {
    if let Some(code) = &input.code {
        let code = code.trim().to_string();
        validate_catalog_code(&code).map_err(LifecycleError::Validation)?;
        input.code = Some(code);
    }
    if let Some(denomination) = &input.denomination {
        validate_required("denomination", denomination).map_err(LifecycleError::Validation)?;
        input.denomination = Some(normalize_denomination(denomination));
    }
    if let Some(status) = &input.status {
        validate_catalog_status(status).map_err(LifecycleError::Validation)?;
    }

    CatalogItemRepo::update(pool, id, &input, Some(user_id))
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "CatalogItem",
            id,
        })
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Refuse references to a catalog item or office that is soft-deleted,
/// excluded or deactivated.
///
/// Both parents stay share-locked until the caller's transaction ends, so a
/// concurrent soft delete either waits for the new reference or is seen here.
pub async fn ensure_active_parents(
    conn: &mut PgConnection,
    catalog_item_id: DbId,
    office_id: DbId,
) -> Result<(), LifecycleError> {
    let item = CatalogItemRepo::lock_shared(&mut *conn, catalog_item_id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "CatalogItem",
            id: catalog_item_id,
        })?;
    if item.is_deleted() {
        return Err(LifecycleError::InactiveParent(format!(
            "catalog item {} is in the recycle bin",
            item.code
        )));
    }
    if item.status != CATALOG_STATUS_ACTIVE {
        return Err(LifecycleError::InactiveParent(format!(
            "catalog item {} is {}",
            item.code, item.status
        )));
    }

    let office = OfficeRepo::lock_shared(&mut *conn, office_id)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "Office",
            id: office_id,
        })?;
    if office.is_deleted() {
        return Err(LifecycleError::InactiveParent(format!(
            "office {} is in the recycle bin",
            office.code
        )));
    }
    if !office.is_active {
        return Err(LifecycleError::InactiveParent(format!(
            "office {} is deactivated",
            office.code
        )));
    }
    Ok(())
}

pub async fn create_asset(
    pool: &DbPool,
    input: CreateAsset,
    user_id: DbId,
) -> Result<Asset, LifecycleError> {
    let mut tx = pool.begin().await?;
    let asset = create_asset_in(&mut tx, input, user_id).await?;
    tx.commit().await?;
    tracing::info!(asset_id = asset.id, asset_code = %asset.asset_code, user_id, "Asset created");
    Ok(asset)
}

/// Normalise, validate and insert an asset on an existing connection.
pub async fn create_asset_in(
    conn: &mut PgConnection,
    mut input: CreateAsset,
    user_id: DbId,
) -> Result<Asset, LifecycleError> {
    input.asset_code = required("asset_code", &input.asset_code)?;
    if let Some(condition) = &input.condition {
        input.condition = Some(parse_condition(condition)?.code().to_string());
    }
    input.plate = input.plate.as_deref().map(normalize_plate);
    ensure_active_parents(conn, input.catalog_item_id, input.office_id).await?;

    let qr_code = match input.qr_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => generate_qr_code(),
    };

    Ok(AssetRepo::create(&mut *conn, &input, &qr_code, Some(user_id)).await?)
}

pub async fn update_asset(
    pool: &DbPool,
    id: DbId,
    input: UpdateAsset,
    user_id: DbId,
) -> Result<Asset, LifecycleError> {
    let mut tx = pool.begin().await?;
    let asset = update_asset_in(&mut tx, id, input, user_id).await?;
    tx.commit().await?;
    Ok(asset)
}

/// Apply a partial update to an active asset on an existing connection.
pub async fn update_asset_in(
    conn: &mut PgConnection,
    id: DbId,
    mut input: UpdateAsset,
    user_id: DbId,
) -> Result<Asset, LifecycleError> {
    let current = AssetRepo::lock_by_id(&mut *conn, id)
        .await?
        .filter(|asset| !asset.is_deleted())
        .ok_or(LifecycleError::NotFound { entity: "Asset", id })?;

    input.asset_code = required_opt("asset_code", input.asset_code.as_ref())?;
    if let Some(condition) = &input.condition {
        input.condition = Some(parse_condition(condition)?.code().to_string());
    }
    input.plate = input.plate.as_deref().map(normalize_plate);

    if input.catalog_item_id.is_some() || input.office_id.is_some() {
        ensure_active_parents(
            conn,
            input.catalog_item_id.unwrap_or(current.catalog_item_id),
            input.office_id.unwrap_or(current.office_id),
        )
        .await?;
    }

    AssetRepo::update(&mut *conn, id, &input, Some(user_id))
        .await?
        .ok_or(LifecycleError::NotFound { entity: "Asset", id })
}

// ---------------------------------------------------------------------------
// Condition changes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub condition: String,
    pub observations: Option<String>,
    pub gps_location: Option<String>,
}

/// Change an asset's condition and record it in the history.
pub async fn change_status(
    pool: &DbPool,
    asset_id: DbId,
    change: StatusChange,
    user_id: DbId,
) -> Result<StatusHistory, LifecycleError> {
    let condition = parse_condition(&change.condition)?;
    let mut tx = pool.begin().await?;
    let asset = AssetRepo::lock_by_id(&mut *tx, asset_id)
        .await?
        .filter(|asset| !asset.is_deleted())
        .ok_or(LifecycleError::NotFound {
            entity: "Asset",
            id: asset_id,
        })?;
    let history = record_condition_in(
        &mut *tx,
        &asset,
        condition,
        change.observations,
        change.gps_location,
        user_id,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        asset_id,
        previous = %history.previous_condition,
        new = %history.new_condition,
        user_id,
        "Asset condition changed"
    );
    Ok(history)
}

/// Write a history row and, when the condition differs, update the asset.
///
/// Called with an unchanged condition for scans and photo records.
pub async fn record_condition_in(
    conn: &mut PgConnection,
    asset: &Asset,
    condition: Condition,
    observations: Option<String>,
    gps_location: Option<String>,
    user_id: DbId,
) -> Result<StatusHistory, LifecycleError> {
    if condition.code() != asset.condition {
        let update = UpdateAsset {
            condition: Some(condition.code().to_string()),
            ..Default::default()
        };
        AssetRepo::update(&mut *conn, asset.id, &update, Some(user_id))
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "Asset",
                id: asset.id,
            })?;
    }

    Ok(StatusHistoryRepo::create(
        &mut *conn,
        &CreateStatusHistory {
            asset_id: asset.id,
            previous_condition: asset.condition.clone(),
            new_condition: condition.code().to_string(),
            observations,
            changed_by: Some(user_id),
            gps_location,
        },
    )
    .await?)
}

// ---------------------------------------------------------------------------
// Quick inventory
// ---------------------------------------------------------------------------

const INVENTORY_OBSERVATION: &str = "Quick inventory from mobile device";

/// A round of label scans confirming that assets are where they should be.
#[derive(Debug, Clone, Deserialize)]
pub struct QuickInventory {
    pub qr_codes: Vec<String>,
    pub gps_location: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    pub qr_code: String,
    pub asset_code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub inventoried: usize,
    pub failed: usize,
    pub items: Vec<InventoryItem>,
}

/// Record an unchanged-condition history row for every scanned asset.
///
/// Each code is handled on its own; unknown or deleted assets are reported
/// and do not stop the round.
pub async fn quick_inventory(
    pool: &DbPool,
    input: QuickInventory,
    user_id: DbId,
) -> Result<InventoryReport, LifecycleError> {
    if input.qr_codes.is_empty() {
        return Err(LifecycleError::Validation(
            "at least one QR code is required".to_string(),
        ));
    }
    let observations = input
        .observations
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(INVENTORY_OBSERVATION)
        .to_string();

    let mut items = Vec::with_capacity(input.qr_codes.len());
    for qr_code in input.qr_codes {
        let result = async {
            let mut tx = pool.begin().await?;
            let asset = AssetRepo::find_by_qr_code(&mut *tx, qr_code.trim(), QueryMode::Active)
                .await?
                .ok_or_else(|| {
                    LifecycleError::Validation(format!("no active asset with QR code '{qr_code}'"))
                })?;
            let asset = AssetRepo::lock_by_id(&mut *tx, asset.id)
                .await?
                .filter(|locked| !locked.is_deleted())
                .ok_or(LifecycleError::NotFound {
                    entity: "Asset",
                    id: asset.id,
                })?;
            let condition = parse_condition(&asset.condition)?;
            record_condition_in(
                &mut *tx,
                &asset,
                condition,
                Some(observations.clone()),
                input.gps_location.clone(),
                user_id,
            )
            .await?;
            tx.commit().await?;
            Ok::<_, LifecycleError>(asset.asset_code)
        }
        .await;

        items.push(match result {
            Ok(asset_code) => InventoryItem {
                qr_code,
                asset_code: Some(asset_code),
                error: None,
            },
            Err(e) => InventoryItem {
                qr_code,
                asset_code: None,
                error: Some(e.to_string()),
            },
        });
    }

    let inventoried = items.iter().filter(|i| i.error.is_none()).count();
    let report = InventoryReport {
        inventoried,
        failed: items.len() - inventoried,
        items,
    };
    tracing::info!(
        user_id,
        inventoried = report.inventoried,
        failed = report.failed,
        "Quick inventory recorded"
    );
    Ok(report)
}

/// Condition history of an asset, including soft-deleted rows and rows of
/// a soft-deleted asset.
pub async fn asset_history(
    pool: &DbPool,
    asset_id: DbId,
) -> Result<Vec<StatusHistory>, LifecycleError> {
    AssetRepo::find_by_id(pool, asset_id, QueryMode::All)
        .await?
        .ok_or(LifecycleError::NotFound {
            entity: "Asset",
            id: asset_id,
        })?;
    Ok(StatusHistoryRepo::list_by_asset(pool, asset_id, QueryMode::All).await?)
}

// ---------------------------------------------------------------------------
// Movements
// ---------------------------------------------------------------------------

pub async fn create_movement(
    pool: &DbPool,
    asset_id: DbId,
    mut input: CreateMovement,
    user_id: DbId,
) -> Result<Movement, LifecycleError> {
    input.reason = required("reason", &input.reason)?;

    let mut tx = pool.begin().await?;
    // The asset lock orders this insert against soft_delete_cascade, which
    // checks for unconfirmed movements under the same lock.
    let asset = AssetRepo::lock_by_id(&mut *tx, asset_id)
        .await?
        .filter(|asset| !asset.is_deleted())
        .ok_or(LifecycleError::NotFound {
            entity: "Asset",
            id: asset_id,
        })?;
    if asset.office_id == input.destination_office_id {
        return Err(LifecycleError::Validation(
            "destination office must differ from the asset's current office".to_string(),
        ));
    }
    let destination = OfficeRepo::lock_shared(&mut *tx, input.destination_office_id)
        .await?
        .filter(|office| !office.is_deleted())
        .ok_or(LifecycleError::InactiveParent(format!(
            "destination office {} is missing or in the recycle bin",
            input.destination_office_id
        )))?;
    if !destination.is_active {
        return Err(LifecycleError::InactiveParent(format!(
            "office {} is deactivated",
            destination.code
        )));
    }

    let movement =
        MovementRepo::create(&mut *tx, asset_id, asset.office_id, &input, Some(user_id)).await?;
    tx.commit().await?;

    tracing::info!(
        movement_id = movement.id,
        asset_id,
        destination_office_id = movement.destination_office_id,
        user_id,
        "Movement created"
    );
    Ok(movement)
}

/// Confirm a movement and move the asset to the destination office.
pub async fn confirm_movement(
    pool: &DbPool,
    movement_id: DbId,
    user_id: DbId,
) -> Result<Movement, LifecycleError> {
    let mut tx = pool.begin().await?;
    let Some(movement) = MovementRepo::confirm(&mut *tx, movement_id).await? else {
        let existing = MovementRepo::find_by_id(&mut *tx, movement_id, QueryMode::Active).await?;
        return Err(match existing {
            Some(m) if m.confirmed => {
                LifecycleError::Conflict(format!("movement {movement_id} is already confirmed"))
            }
            _ => LifecycleError::NotFound {
                entity: "Movement",
                id: movement_id,
            },
        });
    };

    let moved = AssetRepo::set_office(
        &mut *tx,
        movement.asset_id,
        movement.destination_office_id,
        Some(user_id),
    )
    .await?;
    if !moved {
        return Err(LifecycleError::NotFound {
            entity: "Asset",
            id: movement.asset_id,
        });
    }
    tx.commit().await?;

    tracing::info!(movement_id, asset_id = movement.asset_id, user_id, "Movement confirmed");
    Ok(movement)
}
