//! Route definitions for the `/catalog` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::catalog;
use crate::state::AppState;

/// Routes mounted at `/catalog`.
///
/// ```text
/// GET    /        -> list_items   (?mode=active|deleted|all)
/// POST   /        -> create_item
/// GET    /{id}    -> get_item
/// PUT    /{id}    -> update_item
/// DELETE /{id}    -> delete_item  (soft delete, optional {reason})
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_items).post(catalog::create_item))
        .route(
            "/{id}",
            get(catalog::get_item)
                .put(catalog::update_item)
                .delete(catalog::delete_item),
        )
}
