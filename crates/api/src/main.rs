//! API server entry point.

use std::sync::Arc;

use api::config::{Config, StoreBackend};
use kv_store::{InMemoryKvStore, KeyValueStore, RedisKvStore};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn connect_store(config: &Config) -> Arc<dyn KeyValueStore> {
    match config.store_backend {
        StoreBackend::Redis => {
            let url = config.redis_url();
            tracing::info!(address = %config.redis_address, "connecting to redis");
            let store = RedisKvStore::connect(&url)
                .await
                .expect("failed to connect to redis");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store, orders are lost on exit");
            Arc::new(InMemoryKvStore::new())
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Connect the store and fail fast if it is unreachable
    let store = connect_store(&config).await;
    store.ping().await.expect("store did not answer ping");

    // 4. Build the application
    let shutdown = CancellationToken::new();
    let state = api::create_state(store, config.request_timeout(), shutdown.clone());
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, backend = ?config.store_backend, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // In-flight store calls stop instead of holding shutdown open.
            shutdown.cancel();
        })
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
