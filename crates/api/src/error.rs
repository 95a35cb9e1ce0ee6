use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use patrimonio_core::error::CoreError;
use patrimonio_lifecycle::LifecycleError;
use patrimonio_sync::SyncError;
use serde_json::{json, Value};

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of each layer and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `patrimonio_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A lifecycle, ledger or record-service error.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// An offline sync error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A lookup by something other than an id found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Status, machine-readable code, message and optional structured details.
struct ErrorParts {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl ErrorParts {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let parts = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Lifecycle(err) => classify_lifecycle_error(err),
            AppError::Sync(err) => classify_sync_error(err),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => {
                ErrorParts::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            AppError::NotFound(msg) => {
                ErrorParts::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorParts::internal()
            }
        };

        let mut body = json!({
            "error": parts.message,
            "code": parts.code,
        });
        if let Some(details) = parts.details {
            body["details"] = details;
        }

        (parts.status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::NotFound { entity, id } => ErrorParts::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        CoreError::Conflict(msg) => ErrorParts::new(StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => {
            ErrorParts::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
        }
        CoreError::Forbidden(msg) => ErrorParts::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            ErrorParts::internal()
        }
    }
}

/// Business-rule refusals map to 409 and carry the blocking detail.
fn classify_lifecycle_error(err: &LifecycleError) -> ErrorParts {
    let message = err.to_string();
    match err {
        LifecycleError::NotFound { .. } => {
            ErrorParts::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
        }
        LifecycleError::AlreadyDeleted { .. } => {
            ErrorParts::new(StatusCode::CONFLICT, "ALREADY_DELETED", message)
        }
        LifecycleError::NotDeleted { .. } => {
            ErrorParts::new(StatusCode::CONFLICT, "NOT_DELETED", message)
        }
        LifecycleError::ActiveChildren {
            children, count, ..
        } => ErrorParts::new(StatusCode::CONFLICT, "ACTIVE_CHILDREN", message)
            .with_details(json!({ "children": children, "count": count })),
        LifecycleError::UnconfirmedMovements { movement_ids, .. } => {
            ErrorParts::new(StatusCode::CONFLICT, "UNCONFIRMED_MOVEMENTS", message)
                .with_details(json!({ "movement_ids": movement_ids }))
        }
        LifecycleError::AlreadyRestored { .. } => {
            ErrorParts::new(StatusCode::CONFLICT, "ALREADY_RESTORED", message)
        }
        LifecycleError::StillReferenced { .. } => {
            ErrorParts::new(StatusCode::CONFLICT, "STILL_REFERENCED", message)
        }
        LifecycleError::Conflict(msg) => {
            ErrorParts::new(StatusCode::CONFLICT, "CONFLICT", msg.clone())
        }
        LifecycleError::InactiveParent(msg) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "INACTIVE_PARENT", msg.clone())
        }
        LifecycleError::Validation(msg) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        LifecycleError::InvalidConfiguration(msg) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "INVALID_CONFIGURATION", msg.clone())
        }
        LifecycleError::PermissionDenied(msg) => {
            ErrorParts::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
        }
        LifecycleError::InvalidSecurityCode => {
            ErrorParts::new(StatusCode::FORBIDDEN, "INVALID_SECURITY_CODE", message)
        }
        LifecycleError::SecurityLockout => {
            ErrorParts::new(StatusCode::TOO_MANY_REQUESTS, "SECURITY_LOCKOUT", message)
        }
        LifecycleError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal lifecycle error");
            ErrorParts::internal()
        }
        LifecycleError::Database(db) => classify_sqlx_error(db),
    }
}

fn classify_sync_error(err: &SyncError) -> ErrorParts {
    let message = err.to_string();
    match err {
        SyncError::NotFound { .. } => ErrorParts::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
        SyncError::PermissionDenied(msg) => {
            ErrorParts::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
        }
        SyncError::Validation(msg) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        SyncError::InvalidPayload(_) => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", message)
        }
        SyncError::MissingManualPayload => {
            ErrorParts::new(StatusCode::BAD_REQUEST, "MISSING_MANUAL_PAYLOAD", message)
        }
        SyncError::AlreadyResolved { .. } => {
            ErrorParts::new(StatusCode::CONFLICT, "ALREADY_RESOLVED", message)
        }
        SyncError::NotAwaitingResolution { .. } => {
            ErrorParts::new(StatusCode::CONFLICT, "INVALID_TRANSITION", message)
        }
        SyncError::Record(inner) => classify_lifecycle_error(inner),
        SyncError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal sync error");
            ErrorParts::internal()
        }
        SyncError::Database(db) => classify_sqlx_error(db),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => {
            ErrorParts::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
        }
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return ErrorParts::new(
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            ErrorParts::internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            ErrorParts::internal()
        }
    }
}
