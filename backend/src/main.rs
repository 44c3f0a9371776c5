//! # Ripple Chat Backend
//!
//! Binary entry point: loads environment, initializes configuration and
//! logging, then hands off to the relay server.

use lib_relay::{start_server, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("RIPPLE CHAT BACKEND STARTING");

    lib_core::init_config().map_err(|e| anyhow::anyhow!(e))?;

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    start_server(ServerConfig { bind_address }).await
}
