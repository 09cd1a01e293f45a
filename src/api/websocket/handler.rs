//! WebSocket connection handler
//!
//! Drives one subscriber through `Connecting -> Active -> Closed`. The
//! subscriber is registered once the upgrade succeeds and unregistered on
//! every exit path of the read loop.

use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::broadcaster::EventBroadcaster;
use super::events::{ClientMessage, PongMessage};
use super::registry::{SubscriberId, SubscriberRegistry};
use super::subscriber::{Frame, Subscriber, WsSubscriber};
use crate::api::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_failed_upgrade(|e| warn!(error = %e, "failed to upgrade websocket"))
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sink, stream) = socket.split();
    let subscriber: Arc<dyn Subscriber> = Arc::new(WsSubscriber::new(sink));
    serve_connection(&state.broadcaster, subscriber, stream).await;
}

/// Keeps a subscriber registered for exactly as long as it lives.
struct Registration<'a> {
    registry: &'a SubscriberRegistry,
    id: SubscriberId,
}

impl<'a> Registration<'a> {
    fn new(registry: &'a SubscriberRegistry, subscriber: Arc<dyn Subscriber>) -> Self {
        let id = registry.register(subscriber);
        info!(subscriber = %id, clients = registry.len(), "client connected");
        Self { registry, id }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
        info!(subscriber = %self.id, clients = self.registry.len(), "client disconnected");
    }
}

/// Register `subscriber`, run its read loop until the peer goes away, then
/// unregister and close the transport.
///
/// Any read error or close frame ends the loop. Closing is bounded by the
/// broadcaster's send timeout.
pub async fn serve_connection<S, E>(
    broadcaster: &EventBroadcaster,
    subscriber: Arc<dyn Subscriber>,
    mut inbound: S,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let registration = Registration::new(broadcaster.registry(), Arc::clone(&subscriber));

    while let Some(result) = inbound.next().await {
        match result {
            Ok(Message::Text(text)) => handle_client_text(&text, subscriber.as_ref()).await,
            Ok(Message::Close(_)) => {
                debug!(subscriber = %registration.id, "client requested close");
                break;
            }
            // Protocol-level pings are answered by the transport
            Ok(_) => {}
            Err(e) => {
                debug!(subscriber = %registration.id, error = %e, "read error");
                break;
            }
        }
    }

    let id = registration.id;
    drop(registration);

    let timeout = broadcaster.send_timeout();
    if tokio::time::timeout(timeout, subscriber.close()).await.is_err() {
        warn!(subscriber = %id, timeout_ms = timeout.as_millis() as u64, "close timed out");
    }
}

async fn handle_client_text(text: &str, subscriber: &dyn Subscriber) {
    if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(text) {
        if let Ok(json) = serde_json::to_string(&PongMessage::default()) {
            if let Err(e) = subscriber.send(Frame::text(json)).await {
                debug!(error = %e, "failed to answer ping");
            }
        }
    }
}
