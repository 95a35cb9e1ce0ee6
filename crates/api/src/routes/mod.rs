pub mod assets;
pub mod catalog;
pub mod health;
pub mod mobile;
pub mod movements;
pub mod notifications;
pub mod offices;
pub mod recycle_bin;
pub mod retention;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /offices                                 list, create
/// /offices/{id}                            get, update, soft delete
///
/// /catalog                                 list, create
/// /catalog/{id}                            get, update, soft delete
///
/// /assets                                  list, create
/// /assets/{id}                             get, update, cascade soft delete
/// /assets/{id}/history                     condition history (GET)
/// /assets/{id}/status                      change condition (POST)
/// /assets/{id}/movements                   list, create
///
/// /movements/{id}/confirm                  confirm transfer (POST)
///
/// /recycle-bin                             scoped listing (GET)
/// /recycle-bin/stats                       statistics (GET)
/// /recycle-bin/audit                       deletion audit log (GET)
/// /recycle-bin/bulk-restore                restore many (POST)
/// /recycle-bin/bulk-delete                 permanently delete many (POST)
/// /recycle-bin/{id}                        get, permanent delete
/// /recycle-bin/{id}/restore                restore (POST)
///
/// /retention                               list settings (GET)
/// /retention/{module}                      get, update
///
/// /mobile/sync                             submit batch (POST)
/// /mobile/sync/retry                       retry failed changes (POST)
/// /mobile/sync/{session_id}                session status (GET)
/// /mobile/changes/pending                  pending and failed changes (GET)
/// /mobile/conflicts/{id}/resolve           resolve conflict (POST)
/// /mobile/scan/{qr_code}                   scanned asset with history (GET)
/// /mobile/inventory                        quick inventory round (POST)
/// /mobile/dashboard                        registry and sync summary (GET)
///
/// /notifications                           list (GET)
/// /notifications/{id}/read                 mark read (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/offices", offices::router())
        .nest("/catalog", catalog::router())
        .nest("/assets", assets::router())
        .nest("/movements", movements::router())
        .nest("/recycle-bin", recycle_bin::router())
        .nest("/retention", retention::router())
        .nest("/mobile", mobile::router())
        .nest("/notifications", notifications::router())
}
