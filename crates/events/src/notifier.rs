//! The notification delivery seam.
//!
//! Engines hold an `Arc<dyn Notifier>` and treat delivery as best effort:
//! a failed `notify` is logged or reported by the caller and never rolls
//! back the operation that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use patrimonio_core::notifications::Priority;
use patrimonio_core::types::{DbId, Timestamp};
use patrimonio_db::models::notification::CreateNotification;
use patrimonio_db::repositories::NotificationRepo;
use patrimonio_db::DbPool;

use crate::bus::{EventBus, PlatformEvent, EVENT_NOTIFICATION_CREATED};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification storage failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One notification addressed to a single user.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// One of the `KIND_*` constants in [`patrimonio_core::notifications`].
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub payload: serde_json::Value,
    pub expires_at: Option<Timestamp>,
}

impl NotificationMessage {
    pub fn new(kind: &'static str, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            priority: Priority::Normal,
            payload: serde_json::Value::Object(Default::default()),
            expires_at: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn expiring_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: DbId, message: &NotificationMessage) -> Result<(), NotifyError>;
}

/// Persists notifications to the `notifications` table and announces each
/// one on the event bus when a bus is attached.
pub struct DbNotifier {
    pool: DbPool,
    bus: Option<Arc<EventBus>>,
}

impl DbNotifier {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, bus: None }
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(&self, user_id: DbId, message: &NotificationMessage) -> Result<(), NotifyError> {
        let created = NotificationRepo::create(
            &self.pool,
            &CreateNotification {
                user_id,
                kind: message.kind.to_string(),
                title: message.title.clone(),
                message: message.message.clone(),
                priority: message.priority.as_str().to_string(),
                payload: message.payload.clone(),
                expires_at: message.expires_at,
            },
        )
        .await?;

        tracing::debug!(
            notification_id = created.id,
            user_id,
            kind = message.kind,
            "Notification stored"
        );

        if let Some(bus) = &self.bus {
            bus.publish(
                PlatformEvent::new(EVENT_NOTIFICATION_CREATED)
                    .with_source("notification", created.id)
                    .with_payload(serde_json::json!({
                        "user_id": user_id,
                        "kind": message.kind,
                        "priority": message.priority,
                    })),
            );
        }

        Ok(())
    }
}
