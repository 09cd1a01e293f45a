//! Test Inbox
//!
//! Catches inbound email posted by a SendGrid inbound-parse webhook, stores
//! it in SQLite, and serves a small web UI that updates live over WebSocket.
//!
//! # Modules
//!
//! - `api`: axum router, HTML views, webhook and the WebSocket fan-out
//! - `store`: the record store behind the `EmailRepository` trait
//! - `types`: email records and pagination
//! - `server`: composition root, startup and shutdown
//! - `config`: environment-driven configuration
//! - `utils`: logging setup and formatting helpers
//!
//! # Example
//!
//! ```no_run
//! use test_inbox::{InboxServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> test_inbox::InboxResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     InboxServer::new(config)?.run().await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use api::websocket::{EventBroadcaster, Frame, KeepAlive, Subscriber, SubscriberRegistry};
pub use config::ServerConfig;
pub use error::{InboxError, InboxResult};
pub use server::InboxServer;
pub use store::{EmailRepository, SqliteStore, StoreError};
pub use types::{Email, EmailSummary, NewEmail, Page, PageRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
