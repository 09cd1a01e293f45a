//! WebSocket module for live inbox updates
//!
//! Provides the `/ws` endpoint and the subscriber fan-out behind it.
//!
//! ## Features
//! - Registry of connected subscribers; writes happen outside the registry lock
//! - Best-effort broadcast, isolated per subscriber
//! - Process-wide heartbeat every few seconds
//! - Sequence IDs on notification envelopes for gap detection

pub mod broadcaster;
pub mod events;
pub mod handler;
pub mod keepalive;
pub mod registry;
pub mod subscriber;

// Re-export commonly used items
pub use broadcaster::EventBroadcaster;
pub use events::{InboxEvent, WsMessage, HEARTBEAT};
pub use handler::serve_connection;
pub use keepalive::KeepAlive;
pub use registry::{SubscriberId, SubscriberRegistry};
pub use subscriber::{Frame, Subscriber, TransportError, WsSubscriber};
