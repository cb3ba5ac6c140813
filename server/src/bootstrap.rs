//! Application bootstrap and lifecycle.
//!
//! 1. Open the configured record store (and migrate it)
//! 2. Provision seed agents
//! 3. Wire engine, query surface, broadcaster and push hub into [`AppState`]
//! 4. Bind the listener and serve until a shutdown signal
//!
//! On shutdown the server stops accepting connections and in-flight
//! requests get `SHUTDOWN_TIMEOUT` seconds to drain.

use crate::config::{Config, SeedAgent, StoreBackend};
use crate::server::{AppState, build_router};
use anyhow::Context;
use service_queue_core::RecordStore;
use service_queue_core::environment::SystemClock;
use service_queue_postgres::{PoolSettings, PostgresRecordStore};
use service_queue_runtime::metrics::PrometheusMetrics;
use service_queue_runtime::retry::RetryPolicy;
use service_queue_runtime::{
    ChannelBroadcaster, InMemoryRecordStore, QuerySurface, QueueEngine, QueueEnvironment,
};
use service_queue_web::handlers::PushHub;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Open the record store selected by `config`.
///
/// # Errors
///
/// Returns error if the database is unreachable or migrations fail.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        StoreBackend::Postgres => {
            let db = &config.store.database;
            let settings = PoolSettings {
                max_connections: db.max_connections,
                min_connections: db.min_connections,
                connect_timeout: Duration::from_secs(db.connect_timeout),
            };
            let store = PostgresRecordStore::connect(&db.url, &settings)
                .await
                .context("Failed to connect to PostgreSQL")?;
            if db.run_migrations {
                store.migrate().await.context("Failed to run migrations")?;
            }
            Ok(Arc::new(store))
        }
    }
}

/// Provision `agents`, keeping the status of agents that already exist.
///
/// # Errors
///
/// Returns the first store failure.
pub async fn seed_agents(store: &dyn RecordStore, agents: &[SeedAgent]) -> anyhow::Result<()> {
    for agent in agents {
        store
            .provision_agent(agent.name.clone(), agent.password.clone())
            .await
            .with_context(|| format!("Failed to provision agent {}", agent.name))?;
        info!(agent = %agent.name, "Agent provisioned");
    }
    Ok(())
}

/// Wire the shared handler state over `store`.
#[must_use]
pub fn build_state(config: &Config, store: Arc<dyn RecordStore>, metrics: PrometheusMetrics) -> AppState {
    let broadcaster = Arc::new(ChannelBroadcaster::new(config.push.broadcast_capacity));
    let engine = QueueEngine::new(QueueEnvironment::new(
        store,
        broadcaster.clone(),
        Arc::new(SystemClock),
    ));
    let policy = RetryPolicy::builder()
        .max_retries(config.query.max_retries)
        .initial_delay(Duration::from_millis(config.query.retry_initial_delay_ms))
        .build();
    let push = PushHub::new(
        broadcaster,
        config.push.ws_max_connections,
        Duration::from_secs(config.push.ws_ping_interval.max(1)),
    );
    AppState::new(engine.clone(), QuerySurface::new(engine, policy), push, metrics)
}

/// A bound server ready to run.
pub struct Application {
    listener: TcpListener,
    router: axum::Router,
    shutdown_timeout: Duration,
}

impl Application {
    /// Run every bootstrap step and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or seeded, the metrics
    /// recorder cannot be installed, or the address cannot be bound.
    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let store = open_store(config).await?;
        seed_agents(store.as_ref(), &config.seed_agents).await?;

        let metrics = if config.server.metrics_enabled {
            PrometheusMetrics::install().context("Failed to install metrics recorder")?
        } else {
            PrometheusMetrics::disabled()
        };

        let state = build_state(config, store, metrics);
        let router = build_router(state, &config.server.cors_origin);
        let listener = TcpListener::bind(config.bind_address())
            .await
            .with_context(|| format!("Failed to bind {}", config.bind_address()))?;

        Ok(Self {
            listener,
            router,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// Address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns error if the socket has no local address.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns error if the server fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain for at most the
    /// configured timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the server fails.
    pub async fn run_until(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "Queue server listening");

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let server = axum::serve(self.listener, self.router).with_graceful_shutdown(async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
        });
        let mut server = tokio::spawn(async move { server.await });

        tokio::select! {
            result = &mut server => {
                return Ok(result.context("Server task failed")??);
            }
            () = shutdown => {}
        }

        let _ = stop_tx.send(true);
        match tokio::time::timeout(self.shutdown_timeout, &mut server).await {
            Ok(result) => result.context("Server task failed")??,
            Err(_) => {
                warn!(
                    timeout_secs = self.shutdown_timeout.as_secs(),
                    "Graceful shutdown timed out, aborting open connections"
                );
                server.abort();
            }
        }
        info!("Queue server stopped");
        Ok(())
    }
}

/// Resolve on Ctrl+C (SIGINT) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal, shutting down gracefully..."),
        () = terminate => info!("Received SIGTERM signal, shutting down gracefully..."),
    }
}
