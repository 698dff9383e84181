//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use kv_store::KeyValueStore;
use serde::Serialize;

use super::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health: 200 when the store answers a ping, 503 otherwise.
pub async fn check<S: KeyValueStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let ctx = state.request_context();
    let store = state.order_service.repository().store();

    match ctx.run(store.ping()).await {
        Ok(Ok(())) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "store ping failed");
            unavailable()
        }
        Err(interrupted) => {
            tracing::warn!(reason = %interrupted, "store ping interrupted");
            unavailable()
        }
    }
}

fn unavailable() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(HealthResponse {
            status: "unavailable",
        }),
    )
}
