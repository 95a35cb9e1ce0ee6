//! Route definitions for the `/mobile` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::mobile;
use crate::state::AppState;

/// Routes mounted at `/mobile`.
///
/// ```text
/// POST   /sync                       -> submit            (202)
/// POST   /sync/retry                 -> retry
/// GET    /sync/{session_id}          -> session_status
/// GET    /changes/pending            -> pending_changes
/// POST   /conflicts/{id}/resolve     -> resolve_conflict
/// GET    /scan/{qr_code}             -> scan
/// POST   /inventory                  -> quick_inventory
/// GET    /dashboard                  -> dashboard
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", post(mobile::submit))
        .route("/sync/retry", post(mobile::retry))
        .route("/sync/{session_id}", get(mobile::session_status))
        .route("/changes/pending", get(mobile::pending_changes))
        .route("/conflicts/{id}/resolve", post(mobile::resolve_conflict))
        .route("/scan/{qr_code}", get(mobile::scan))
        .route("/inventory", post(mobile::quick_inventory))
        .route("/dashboard", get(mobile::dashboard))
}
