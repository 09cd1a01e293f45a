//! Subscriber transport abstraction
//!
//! A [`Subscriber`] is the write half of one live push connection. The
//! registry and broadcaster only ever see this trait, so tests can swap in
//! in-process doubles for real WebSockets.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::sync::Mutex;

/// One outbound text frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub fn text(payload: impl Into<String>) -> Self {
        Frame(payload.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        Message::Text(frame.0)
    }
}

/// Write failures on a subscriber transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Io(String),
}

/// Write half of a live push connection
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Deliver one frame
    async fn send(&self, frame: Frame) -> Result<(), TransportError>;

    /// Close the transport; further sends fail
    async fn close(&self);
}

/// WebSocket-backed subscriber.
///
/// The sink sits behind its own async mutex so concurrent broadcasts never
/// interleave partial writes on one socket.
pub struct WsSubscriber {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSubscriber {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl Subscriber for WsSubscriber {
    async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.send(frame.into())
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        // Peer may already be gone; nothing left to release in that case.
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    }
}
