//! Route definitions for the `/assets` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Routes mounted at `/assets`.
///
/// ```text
/// GET    /                  -> list_assets     (?office_id=&mode=)
/// POST   /                  -> create_asset
/// GET    /{id}              -> get_asset
/// PUT    /{id}              -> update_asset
/// DELETE /{id}              -> delete_asset    (cascade soft delete)
/// GET    /{id}/history      -> history
/// POST   /{id}/status       -> change_status
/// GET    /{id}/movements    -> list_movements
/// POST   /{id}/movements    -> create_movement
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/{id}",
            get(assets::get_asset)
                .put(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route("/{id}/history", get(assets::history))
        .route("/{id}/status", post(assets::change_status))
        .route(
            "/{id}/movements",
            get(assets::list_movements).post(assets::create_movement),
        )
}
