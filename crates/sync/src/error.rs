use patrimonio_core::error::CoreError;
use patrimonio_core::types::DbId;
use patrimonio_lifecycle::LifecycleError;

/// Errors raised by the sync engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid change payload: {0}")]
    InvalidPayload(String),

    #[error("Manual resolution requires a replacement payload")]
    MissingManualPayload,

    #[error("Conflict {conflict_id} is already resolved")]
    AlreadyResolved { conflict_id: DbId },

    #[error("Offline change {change_id} is not awaiting conflict resolution")]
    NotAwaitingResolution { change_id: DbId },

    #[error(transparent)]
    Record(#[from] LifecycleError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => SyncError::NotFound { entity, id },
            CoreError::Validation(msg) | CoreError::Conflict(msg) => SyncError::Validation(msg),
            CoreError::Unauthorized(msg) | CoreError::Forbidden(msg) => {
                SyncError::PermissionDenied(msg)
            }
            CoreError::Internal(msg) => SyncError::Internal(msg),
        }
    }
}
