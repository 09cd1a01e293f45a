//! Shared application state

use std::sync::Arc;
use std::time::Duration;

use crate::api::websocket::EventBroadcaster;
use crate::store::EmailRepository;

/// State shared by every request handler
pub struct AppState {
    /// The record store
    pub store: Arc<dyn EmailRepository>,

    /// Fan-out to connected WebSocket clients
    pub broadcaster: Arc<EventBroadcaster>,
}

impl AppState {
    pub fn new(store: Arc<dyn EmailRepository>, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { store, broadcaster }
    }

    /// State with a fresh broadcaster using the given per-write timeout
    pub fn with_store(store: Arc<dyn EmailRepository>, send_timeout: Duration) -> Self {
        Self::new(store, Arc::new(EventBroadcaster::new(send_timeout)))
    }
}
