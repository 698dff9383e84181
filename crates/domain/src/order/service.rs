//! Order service providing a simplified API for order operations.

use chrono::Utc;
use common::OrderId;
use kv_store::KeyValueStore;

use crate::context::OpContext;
use crate::error::{DomainError, RepositoryError};
use crate::pagination::{OrderPage, PageRequest};
use crate::repository::OrderRepository;

use super::{CustomerId, LineItem, Order, transition};

/// Attempts at finding a free random id before giving up.
const CREATE_ATTEMPTS: usize = 3;

/// Service for managing orders.
///
/// Assigns ids and timestamps on creation and runs status changes through
/// the lifecycle rules before persisting them.
pub struct OrderService<S> {
    repository: OrderRepository<S>,
    next_id: IdSource,
}

type IdSource = Box<dyn Fn() -> OrderId + Send + Sync>;

impl<S: KeyValueStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self::with_id_source(store, OrderId::random)
    }

    /// Creates a service that draws new order ids from `next_id`.
    pub fn with_id_source(
        store: S,
        next_id: impl Fn() -> OrderId + Send + Sync + 'static,
    ) -> Self {
        Self {
            repository: OrderRepository::new(store),
            next_id: Box::new(next_id),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &OrderRepository<S> {
        &self.repository
    }

    /// Places a new order under a fresh random id.
    #[tracing::instrument(skip(self, ctx, line_items), fields(items = line_items.len()))]
    pub async fn create_order(
        &self,
        ctx: &OpContext,
        customer_id: CustomerId,
        line_items: Vec<LineItem>,
    ) -> Result<Order, DomainError> {
        let mut order = Order::new((self.next_id)(), customer_id, line_items, Utc::now())?;

        let mut attempt = 1;
        loop {
            match self.repository.create(ctx, order.clone()).await {
                Ok(created) => {
                    metrics::counter!("orders_created_total").increment(1);
                    tracing::info!(order_id = %created.id(), "order created");
                    return Ok(created);
                }
                Err(RepositoryError::AlreadyExists(id)) if attempt < CREATE_ATTEMPTS => {
                    tracing::warn!(order_id = %id, attempt, "order id taken, retrying");
                    attempt += 1;
                    order = order.with_id((self.next_id)());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Loads an order by id.
    pub async fn get_order(&self, ctx: &OpContext, id: OrderId) -> Result<Order, DomainError> {
        Ok(self.repository.get_by_id(ctx, id).await?)
    }

    /// Deletes an order by id.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_order(&self, ctx: &OpContext, id: OrderId) -> Result<(), DomainError> {
        self.repository.delete_by_id(ctx, id).await?;
        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    /// Lists one page of orders.
    pub async fn list_orders(
        &self,
        ctx: &OpContext,
        request: PageRequest,
    ) -> Result<OrderPage, DomainError> {
        Ok(self.repository.list(ctx, request).await?)
    }

    /// Moves an order to the requested status and persists it.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn update_status(
        &self,
        ctx: &OpContext,
        id: OrderId,
        status: &str,
    ) -> Result<Order, DomainError> {
        let order = self.repository.get_by_id(ctx, id).await?;
        let order = transition(order, status)?;
        let order = self.repository.update_by_id(ctx, id, order).await?;

        metrics::counter!("order_status_transitions_total", "status" => order.status().as_str())
            .increment(1);
        tracing::info!(order_id = %id, status = %order.status(), "order status changed");
        Ok(order)
    }
}
