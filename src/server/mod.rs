//! Inbox server - composition root
//!
//! Owns the single store and broadcaster instances, wires them into the
//! router, and drives startup and shutdown.

mod shutdown;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::websocket::{EventBroadcaster, KeepAlive};
use crate::api::{create_router, AppState};
use crate::config::ServerConfig;
use crate::error::InboxResult;
use crate::store::{EmailRepository, SqliteStore};

pub use shutdown::signal;

/// HTTP + WebSocket server for the inbox
pub struct InboxServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl InboxServer {
    /// Open the configured database and build shared state
    pub fn new(config: ServerConfig) -> InboxResult<Self> {
        let store = SqliteStore::open(&config.database_path)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Build the server around an existing store
    pub fn with_store(config: ServerConfig, store: Arc<dyn EmailRepository>) -> Self {
        let broadcaster = Arc::new(EventBroadcaster::new(config.send_timeout));
        let state = Arc::new(AppState::new(store, broadcaster));
        Self { config, state }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Serve until Ctrl-C / SIGTERM
    pub async fn run(self) -> InboxResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// On shutdown the heartbeat stops first, then every subscriber transport
    /// is closed so read loops end, then in-flight HTTP requests drain.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> InboxResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let broadcaster = Arc::clone(&self.state.broadcaster);
        let keepalive = KeepAlive::spawn(Arc::clone(&broadcaster), self.config.heartbeat_interval);

        let app = create_router(
            Arc::clone(&self.state),
            &self.config.public_dir,
            self.config.max_body_bytes,
        );

        info!(addr = %listener.local_addr()?, "inbox server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                keepalive.shutdown().await;
                broadcaster.close_all().await;
            })
            .await?;

        info!("inbox server stopped");
        Ok(())
    }
}
