//! Service queue server.
//!
//! # Usage
//!
//! ```bash
//! # In-memory store, two agents
//! QUEUE_SEED_AGENTS=agent1:secret,agent2:secret cargo run --bin server
//!
//! # PostgreSQL
//! QUEUE_STORE=postgres DATABASE_URL=postgres://localhost/service_queue cargo run --bin server
//! ```

use queue_server::{Application, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,queue_server=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        backend = ?config.store.backend,
        address = %config.bind_address(),
        seed_agents = config.seed_agents.len(),
        "Configuration loaded"
    );

    Application::build(&config).await?.run().await
}
