//! Route definitions for the `/movements` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::movements;
use crate::state::AppState;

/// Routes mounted at `/movements`.
///
/// ```text
/// POST   /{id}/confirm    -> confirm_movement
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/confirm", post(movements::confirm_movement))
}
