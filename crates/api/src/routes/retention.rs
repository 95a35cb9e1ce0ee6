//! Route definitions for the `/retention` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::retention;
use crate::state::AppState;

/// Routes mounted at `/retention`.
///
/// ```text
/// GET    /            -> list_settings
/// GET    /{module}    -> get_settings
/// PUT    /{module}    -> update_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(retention::list_settings))
        .route(
            "/{module}",
            get(retention::get_settings).put(retention::update_settings),
        )
}
