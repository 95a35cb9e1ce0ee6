use std::sync::Arc;

use patrimonio_events::{EventBus, Notifier};
use patrimonio_sync::SyncEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: patrimonio_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for lifecycle and sync events.
    pub event_bus: Arc<EventBus>,
    /// Delivery seam for user notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Offline sync engine; replays run on spawned tasks.
    pub sync: SyncEngine,
}

impl AppState {
    pub fn new(
        pool: patrimonio_db::DbPool,
        config: ServerConfig,
        event_bus: Arc<EventBus>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let sync = SyncEngine::new(pool.clone(), Arc::clone(&notifier), Arc::clone(&event_bus));
        Self {
            pool,
            config: Arc::new(config),
            event_bus,
            notifier,
            sync,
        }
    }
}
