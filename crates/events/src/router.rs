//! Event-to-notification routing.
//!
//! [`NotificationRouter`] subscribes to the event bus and tells the user who
//! originally deleted a record when someone else restores it or when it is
//! permanently deleted.

use std::sync::Arc;

use patrimonio_core::notifications::{Priority, KIND_RECYCLE_PURGED, KIND_RECYCLE_RESTORED};
use patrimonio_core::types::DbId;
use tokio::sync::broadcast;

use crate::bus::{PlatformEvent, EVENT_RECYCLE_PURGED, EVENT_RECYCLE_RESTORED};
use crate::notifier::{NotificationMessage, Notifier, NotifyError};

/// Routes recycle-bin events to the original deleter.
///
/// Expected payload fields: `deleted_by`, `object_repr`, `entity_kind`,
/// `module_name`.
pub struct NotificationRouter {
    notifier: Arc<dyn Notifier>,
}

impl NotificationRouter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Run the routing loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route a single event. Events this router does not handle are ignored.
    pub async fn route_event(&self, event: &PlatformEvent) -> Result<(), NotifyError> {
        let Some((user_id, message)) = build_message(event) else {
            return Ok(());
        };
        self.notifier.notify(user_id, &message).await
    }
}

/// Pick the recipient and compose the message for `event`.
///
/// Nobody is notified about their own action.
fn build_message(event: &PlatformEvent) -> Option<(DbId, NotificationMessage)> {
    let deleted_by = event.payload.get("deleted_by")?.as_i64()?;
    if event.actor_user_id == Some(deleted_by) {
        return None;
    }
    let repr = event
        .payload
        .get("object_repr")
        .and_then(|v| v.as_str())
        .unwrap_or("record");

    let message = match event.event_type.as_str() {
        EVENT_RECYCLE_RESTORED => NotificationMessage::new(
            KIND_RECYCLE_RESTORED,
            "Record restored",
            format!("'{repr}', which you deleted, was restored from the recycle bin."),
        ),
        EVENT_RECYCLE_PURGED => NotificationMessage::new(
            KIND_RECYCLE_PURGED,
            "Record permanently deleted",
            format!("'{repr}', which you deleted, was permanently removed."),
        )
        .with_priority(Priority::High),
        _ => return None,
    };

    Some((deleted_by, message.with_payload(event.payload.clone())))
}
