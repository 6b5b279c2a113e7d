//! eventgate HTTP server.

use anyhow::Context;
use eventgate_core::clock::SystemClock;
use eventgate_core::store::RecordStore;
use eventgate_postgres::PostgresRecordStore;
use eventgate_server::config::{Config, StoreBackend};
use eventgate_server::server::shutdown_signal;
use eventgate_server::{AppState, EventService, build_router, metrics};
use eventgate_testing::InMemoryRecordStore;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        backend = ?config.store.backend,
        countdown_tick_ms = config.engine.countdown_tick_ms,
        analytics_top_n = config.engine.analytics_top_n,
        "Starting eventgate server"
    );

    let (store, postgres): (Arc<dyn RecordStore>, Option<PostgresRecordStore>) =
        match config.store.backend {
            StoreBackend::Memory => {
                warn!("Using the in-memory record store; state is lost on restart");
                (Arc::new(InMemoryRecordStore::new()), None)
            }
            StoreBackend::Postgres => {
                info!("Connecting to PostgreSQL...");
                let postgres =
                    PostgresRecordStore::connect(&config.postgres.url, config.postgres.max_connections)
                        .await
                        .context("Failed to connect to PostgreSQL")?;
                if config.postgres.run_migrations {
                    postgres.migrate().await.context("Failed to run migrations")?;
                    info!("Migrations applied");
                }
                (Arc::new(postgres.clone()), Some(postgres))
            }
        };

    let service = EventService::new(store, Arc::new(SystemClock), config.engine.analytics_top_n);
    let mut state = AppState::new(
        service,
        Duration::from_millis(config.engine.countdown_tick_ms),
    );

    if let Some(postgres) = postgres {
        state = state.with_postgres(postgres);
    }

    if config.server.metrics_enabled {
        match metrics::install_recorder() {
            Ok(handle) => {
                state = state.with_metrics(handle);
                info!("Prometheus metrics available at /metrics");
            }
            Err(error) => warn!(%error, "Metrics disabled"),
        }
    }

    let app = build_router(state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        // A dropped sender also ends the wait.
        let _ = stop_rx.wait_for(|stop| *stop).await;
    });
    let mut server = tokio::spawn(serve.into_future());

    tokio::select! {
        joined = &mut server => {
            joined??;
            info!("Server stopped");
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    stop_tx.send_replace(true);
    let grace = Duration::from_secs(config.server.shutdown_timeout);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        // Countdown streams can outlive any reasonable grace period.
        Err(_) => warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out, closing open connections"),
    }

    info!("Server stopped");
    Ok(())
}
