//! HTTP API for the order service.
//!
//! Exposes order CRUD and status transitions over a key-value store, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use domain::OrderService;
use kv_store::KeyValueStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: KeyValueStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .put(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store`.
///
/// Every request gets a deadline of `request_timeout` and is canceled when
/// `shutdown` fires.
pub fn create_state<S: KeyValueStore>(
    store: S,
    request_timeout: Duration,
    shutdown: CancellationToken,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        order_service: OrderService::new(store),
        request_timeout,
        shutdown,
    })
}
