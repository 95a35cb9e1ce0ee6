//! Route definitions for the `/offices` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::offices;
use crate::state::AppState;

/// Routes mounted at `/offices`.
///
/// ```text
/// GET    /        -> list_offices   (?mode=active|deleted|all)
/// POST   /        -> create_office
/// GET    /{id}    -> get_office
/// PUT    /{id}    -> update_office
/// DELETE /{id}    -> delete_office  (soft delete, optional {reason})
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(offices::list_offices).post(offices::create_office))
        .route(
            "/{id}",
            get(offices::get_office)
                .put(offices::update_office)
                .delete(offices::delete_office),
        )
}
