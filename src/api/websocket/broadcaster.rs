//! Broadcast fan-out
//!
//! Delivers one frame to every registered subscriber. Membership is copied
//! under the registry lock and the lock is released before any write, so a
//! slow peer never stalls registration or removal of others.
//!
//! Delivery is best-effort: a failed or timed-out write is logged and the
//! remaining subscribers are still served. Failed subscribers stay registered
//! until their own read loop notices the disconnect.
//!
//! Notifications from `notify_new` are chained: each one waits for the
//! previous delivery, so every subscriber sees sequence ids in order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use super::events::{InboxEvent, WsMessage, HEARTBEAT};
use super::registry::{SubscriberId, SubscriberRegistry};
use super::subscriber::{Frame, Subscriber, TransportError};
use crate::types::Email;

/// Default bound on a single subscriber write
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Event broadcaster for WebSocket notifications
pub struct EventBroadcaster {
    registry: SubscriberRegistry,
    sequence_counter: AtomicU64,
    send_timeout: Duration,
    /// Last spawned notification; the next one awaits it before sending
    notify_tail: Mutex<Option<JoinHandle<()>>>,
}

impl EventBroadcaster {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            sequence_counter: AtomicU64::new(0),
            send_timeout,
            notify_tail: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Bound applied to each write and close on a subscriber
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Get the current sequence ID
    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }

    /// Deliver `frame` to every subscriber registered at the time of the call
    pub async fn broadcast(&self, frame: Frame) {
        let targets = self.registry.snapshot();
        if targets.is_empty() {
            trace!("no subscribers, dropping frame");
            return;
        }

        let total = targets.len();
        debug!(subscribers = total, bytes = frame.len(), "broadcasting frame");

        let deliveries = targets
            .into_iter()
            .map(|(id, subscriber)| self.deliver(id, subscriber, frame.clone()));
        let delivered = join_all(deliveries)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count();

        debug!(delivered, failed = total - delivered, "broadcast complete");
    }

    async fn deliver(&self, id: SubscriberId, subscriber: Arc<dyn Subscriber>, frame: Frame) -> bool {
        let result = match tokio::time::timeout(self.send_timeout, subscriber.send(frame)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.send_timeout)),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(subscriber = %id, error = %e, "failed to send message to a client");
                false
            }
        }
    }

    /// Wrap an event in a sequenced envelope and broadcast it
    pub async fn publish(&self, event: InboxEvent) {
        let seq = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        self.send_event(seq, event).await;
    }

    async fn send_event(&self, seq: u64, event: InboxEvent) {
        let msg = WsMessage {
            event,
            sequence_id: seq,
            timestamp: chrono::Utc::now().timestamp(),
        };

        match serde_json::to_string(&msg) {
            Ok(json) => self.broadcast(Frame::text(json)).await,
            Err(e) => error!(sequence_id = seq, error = %e, "failed to serialize event"),
        }
    }

    /// Announce a newly stored message without waiting for delivery.
    ///
    /// The sequence id is taken here, in call order, and delivery runs after
    /// the previous notification has finished.
    pub fn notify_new(self: &Arc<Self>, email: &Email) {
        let broadcaster = Arc::clone(self);
        let event = InboxEvent::EmailReceived {
            payload: email.clone(),
        };

        let mut tail = self.notify_tail.lock();
        let seq = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        let previous = tail.take();
        *tail = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            broadcaster.send_event(seq, event).await;
        }));
    }

    /// Broadcast the keep-alive sentinel
    pub async fn heartbeat(&self) {
        self.broadcast(Frame::text(HEARTBEAT)).await;
    }

    /// Close every subscriber transport and empty the registry
    pub async fn close_all(&self) {
        let subscribers = self.registry.drain();
        if subscribers.is_empty() {
            return;
        }
        debug!(subscribers = subscribers.len(), "closing subscriber transports");
        join_all(subscribers.iter().map(|(_, subscriber)| subscriber.close())).await;
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_TIMEOUT)
    }
}
