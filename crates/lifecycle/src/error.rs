use patrimonio_core::error::CoreError;
use patrimonio_core::types::DbId;

/// Postgres `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Errors raised by the lifecycle engine and the recycle-bin ledger.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{entity} {id} is already deleted")]
    AlreadyDeleted { entity: &'static str, id: DbId },

    #[error("{entity} {id} is not deleted")]
    NotDeleted { entity: &'static str, id: DbId },

    #[error("{entity} {id} still has {count} active {children}")]
    ActiveChildren {
        entity: &'static str,
        id: DbId,
        children: &'static str,
        count: i64,
    },

    #[error("Asset {asset_id} has unconfirmed movements: {movement_ids:?}")]
    UnconfirmedMovements {
        asset_id: DbId,
        movement_ids: Vec<DbId>,
    },

    #[error("Inactive parent: {0}")]
    InactiveParent(String),

    #[error("Recycle-bin entry {entry_id} has already been restored")]
    AlreadyRestored { entry_id: DbId },

    #[error("{entity} {id} is still referenced by other records")]
    StillReferenced { entity: &'static str, id: DbId },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Security code is incorrect")]
    InvalidSecurityCode,

    #[error("Too many failed security code attempts; try again later")]
    SecurityLockout,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid retention configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CoreError> for LifecycleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => LifecycleError::NotFound { entity, id },
            CoreError::Validation(msg) => LifecycleError::Validation(msg),
            CoreError::Conflict(msg) => LifecycleError::Conflict(msg),
            CoreError::Unauthorized(msg) | CoreError::Forbidden(msg) => {
                LifecycleError::PermissionDenied(msg)
            }
            CoreError::Internal(msg) => LifecycleError::Internal(msg),
        }
    }
}

impl LifecycleError {
    /// Translate a failed physical delete: a foreign-key violation means
    /// soft-deleted rows still point at the target.
    pub(crate) fn from_purge(entity: &'static str, id: DbId, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                LifecycleError::StillReferenced { entity, id }
            }
            _ => LifecycleError::Database(err),
        }
    }
}
