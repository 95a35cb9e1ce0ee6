//! Route definitions for the `/recycle-bin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::recycle_bin;
use crate::state::AppState;

/// Routes mounted at `/recycle-bin`.
///
/// ```text
/// GET    /                 -> list_entries   (?scope=&module=&kind=&state=&search=)
/// GET    /stats            -> statistics
/// GET    /audit            -> audit_logs     (?action=&module=&user_id=&since=&until=)
/// POST   /bulk-restore     -> bulk_restore
/// POST   /bulk-delete      -> bulk_permanent_delete
/// GET    /{id}             -> get_entry
/// DELETE /{id}             -> permanent_delete
/// POST   /{id}/restore     -> restore
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(recycle_bin::list_entries))
        .route("/stats", get(recycle_bin::statistics))
        .route("/audit", get(recycle_bin::audit_logs))
        .route("/bulk-restore", post(recycle_bin::bulk_restore))
        .route("/bulk-delete", post(recycle_bin::bulk_permanent_delete))
        .route(
            "/{id}",
            get(recycle_bin::get_entry).delete(recycle_bin::permanent_delete),
        )
        .route("/{id}/restore", post(recycle_bin::restore))
}
