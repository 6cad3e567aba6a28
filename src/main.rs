//! message-server: serves numbered messages over TCP
//!
//! Features:
//! - Fixed-size binary request/response frames
//! - Persistent and transient connections, chosen per request
//! - One task per client, sharing a read-only message catalog
//! - Configuration via CLI arguments or TOML file

use message_lookup::config::Config;
use message_lookup::{MessageStore, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        messages = %config.messages_path.display(),
        backlog = config.backlog,
        seeded = config.seed.is_some(),
        "Starting message server"
    );

    // A missing or malformed catalog stops startup before anything is bound
    let store = MessageStore::load(&config.messages_path)?;

    let server = Server::bind(config, store).await?;
    server.run().await;

    Ok(())
}
