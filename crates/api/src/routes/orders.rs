//! Order CRUD and status endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{
    Cursor, CustomerId, DEFAULT_PAGE_SIZE, LineItem, OpContext, Order, OrderPage, OrderService,
    PageRequest,
};
use kv_store::KeyValueStore;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub order_service: OrderService<S>,
    pub request_timeout: Duration,
    /// Fired on shutdown; every request context derives from it.
    pub shutdown: CancellationToken,
}

impl<S> AppState<S> {
    /// Builds the context for one request.
    pub fn request_context(&self) -> OpContext {
        OpContext::with_timeout(self.request_timeout).with_cancellation(self.shutdown.child_token())
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub line_items: Option<Vec<LineItem>>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub cursor: Option<String>,
    #[serde(alias = "pageSize")]
    pub size: Option<usize>,
}

// -- Handlers --

/// POST /orders: place a new order.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: KeyValueStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let ctx = state.request_context();

    let order = state
        .order_service
        .create_order(&ctx, req.customer_id, req.line_items.unwrap_or_default())
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: one page of orders.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: KeyValueStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<OrderPage>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let cursor = match query.cursor.as_deref() {
        Some(raw) => raw
            .parse::<Cursor>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => Cursor::START,
    };
    let request = PageRequest::new(query.size.unwrap_or(DEFAULT_PAGE_SIZE), cursor)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let ctx = state.request_context();

    let page = state.order_service.list_orders(&ctx, request).await?;
    Ok(Json(page))
}

/// GET /orders/{id}: load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: KeyValueStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let ctx = state.request_context();

    let order = state.order_service.get_order(&ctx, order_id).await?;
    Ok(Json(order))
}

/// PUT /orders/{id}: move an order to a new status.
#[tracing::instrument(skip(state, body))]
pub async fn update<S: KeyValueStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let ctx = state.request_context();

    let order = state
        .order_service
        .update_status(&ctx, order_id, &req.status)
        .await?;
    Ok(Json(order))
}

/// DELETE /orders/{id}: remove an order.
#[tracing::instrument(skip(state))]
pub async fn delete<S: KeyValueStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&id)?;
    let ctx = state.request_context();

    state.order_service.delete_order(&ctx, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid order id: {id}")))
}
