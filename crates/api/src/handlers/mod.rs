pub mod assets;
pub mod catalog;
pub mod mobile;
pub mod movements;
pub mod notifications;
pub mod offices;
pub mod recycle_bin;
pub mod retention;

use axum::Json;
use patrimonio_core::entity::QueryMode;
use patrimonio_core::permissions::{Capability, Principal};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// `?mode=active|deleted|all` on registry listings and lookups.
#[derive(Debug, Default, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

impl ModeQuery {
    /// Parse the requested mode. Anything beyond active rows needs at
    /// least the right to see one's own recycle bin.
    pub fn resolve(&self, principal: &Principal) -> AppResult<QueryMode> {
        let mode = match self.mode.as_deref() {
            None => QueryMode::Active,
            Some(raw) => QueryMode::parse(raw).map_err(AppError::BadRequest)?,
        };
        if mode != QueryMode::Active {
            principal.require(Capability::ViewOwnEntries)?;
        }
        Ok(mode)
    }
}

/// Optional body of a soft-delete request.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub reason: String,
}

/// The deletion reason from an optional body, trimmed.
pub(crate) fn deletion_reason(body: Option<Json<DeleteRequest>>) -> String {
    body.map(|Json(req)| req.reason.trim().to_string())
        .unwrap_or_default()
}
