//! Test Inbox - Binary Entry Point
//!
//! This is the main entry point for the inbox-server binary.

use test_inbox::config::ServerConfig;
use test_inbox::server::InboxServer;
use test_inbox::utils::logging;
use test_inbox::InboxResult;

#[tokio::main]
async fn main() -> InboxResult<()> {
    // Missing .env is normal outside local development
    let _ = dotenvy::dotenv();

    let config = ServerConfig::from_env()?;
    logging::init(config.environment, config.log_level.as_deref());

    tracing::info!(
        version = test_inbox::VERSION,
        database = %config.database_path.display(),
        "starting inbox server"
    );

    InboxServer::new(config)?.run().await
}
