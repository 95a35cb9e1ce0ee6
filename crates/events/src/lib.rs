//! Patrimonio event bus and notification dispatch.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope.
//! - [`Notifier`]: the delivery seam the lifecycle and sync engines call.
//!   [`DbNotifier`] persists to the `notifications` table.
//! - [`NotificationRouter`]: turns recycle-bin events into notifications for
//!   the original deleter, off the request path.

pub mod bus;
pub mod notifier;
pub mod router;

pub use bus::{EventBus, PlatformEvent};
pub use notifier::{DbNotifier, NotificationMessage, Notifier, NotifyError};
pub use router::NotificationRouter;
