//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`CurrentUser`] and rejects requests the stored
//! account may not make. Ledger and sync operations check their finer
//! capabilities themselves.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use patrimonio_core::error::CoreError;
use patrimonio_core::permissions::Capability;

use super::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires an active account. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn list(RequireActive(user): RequireActive) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireActive(pub CurrentUser);

impl FromRequestParts<AppState> for RequireActive {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.user.is_active {
            return Err(AppError::Core(CoreError::Forbidden(
                "User account is deactivated".into(),
            )));
        }
        Ok(RequireActive(user))
    }
}

/// Requires the `EditRecords` capability (administrator or staff).
pub struct RequireEditor(pub CurrentUser);

impl FromRequestParts<AppState> for RequireEditor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        user.principal.require(Capability::EditRecords)?;
        Ok(RequireEditor(user))
    }
}
