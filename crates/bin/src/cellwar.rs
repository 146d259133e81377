//! Cellwar - authoritative arena server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Cellwar Server v{}", env!("CARGO_PKG_VERSION"));

    // Load server configuration
    let config = server::Config::load()?;
    info!(
        "World {}x{}, {} food, {} viruses, {} bots, {} ticks/s",
        config.world.size,
        config.world.size,
        config.world.food_count,
        config.world.virus_count,
        config.server.bots,
        config.server.tick_rate
    );

    server::run(config).await
}
