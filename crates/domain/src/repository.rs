//! Order persistence over a key-value store.
//!
//! Each order is stored as a JSON document under `order:<id>`, and its key is
//! a member of the `orders` set. Writes that touch both go through a single
//! atomic batch, so the set and the stored orders always match.

use std::future::Future;
use std::time::Instant;

use common::OrderId;
use kv_store::{KeyValueStore, StoreError, WriteBatch};
use tracing::{debug, warn};

use crate::context::OpContext;
use crate::error::RepositoryError;
use crate::pagination::{Cursor, OrderPage, PageRequest};
use crate::Order;

/// Prefix of every order record key.
pub const ORDER_KEY_PREFIX: &str = "order:";

/// Key of the set indexing every stored order.
pub const ORDER_INDEX_KEY: &str = "orders";

/// Returns the storage key for an order id.
pub fn order_key(id: OrderId) -> String {
    format!("{ORDER_KEY_PREFIX}{id}")
}

/// Stores, loads and lists orders.
///
/// The repository holds no state besides the store handle.
#[derive(Clone)]
pub struct OrderRepository<S> {
    store: S,
}

impl<S: KeyValueStore> OrderRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists a new order and indexes it.
    ///
    /// Fails with `AlreadyExists` if an order is stored under the same id;
    /// the existing record is left untouched.
    #[tracing::instrument(skip(self, ctx, order), fields(order_id = %order.id()))]
    pub async fn create(&self, ctx: &OpContext, order: Order) -> Result<Order, RepositoryError> {
        let key = order_key(order.id());
        let value = encode(&order)?;

        // SADD is a no-op when SET NX loses, since the key is already indexed.
        let batch = WriteBatch::new()
            .set_if_absent(key.clone(), value)
            .set_add(ORDER_INDEX_KEY, key);
        let outcome = self
            .call(ctx, "create", self.store.commit(batch), RepositoryError::Store)
            .await?;

        if !outcome.applied(0) {
            return Err(RepositoryError::AlreadyExists(order.id()));
        }

        debug!("order stored");
        Ok(order)
    }

    /// Loads an order.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_by_id(&self, ctx: &OpContext, id: OrderId) -> Result<Order, RepositoryError> {
        let key = order_key(id);
        let value = self
            .call(ctx, "get", self.store.get(&key), RepositoryError::Store)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;

        decode(&key, &value)
    }

    /// Replaces a stored order. Never creates one.
    ///
    /// Concurrent updates of the same order are last-writer-wins.
    #[tracing::instrument(skip(self, ctx, order))]
    pub async fn update_by_id(
        &self,
        ctx: &OpContext,
        id: OrderId,
        order: Order,
    ) -> Result<Order, RepositoryError> {
        if order.id() != id {
            return Err(RepositoryError::IdMismatch {
                expected: id,
                actual: order.id(),
            });
        }

        let value = encode(&order)?;
        let batch = WriteBatch::new().set_if_present(order_key(id), value);
        let outcome = self
            .call(ctx, "update", self.store.commit(batch), RepositoryError::Store)
            .await?;

        if !outcome.applied(0) {
            return Err(RepositoryError::NotFound(id));
        }

        debug!(status = %order.status(), "order updated");
        Ok(order)
    }

    /// Removes an order and its index entry.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_by_id(&self, ctx: &OpContext, id: OrderId) -> Result<(), RepositoryError> {
        let key = order_key(id);
        let batch = WriteBatch::new()
            .delete(key.clone())
            .set_remove(ORDER_INDEX_KEY, key);
        let outcome = self
            .call(ctx, "delete", self.store.commit(batch), RepositoryError::Store)
            .await?;

        if !outcome.applied(0) {
            return Err(RepositoryError::NotFound(id));
        }

        debug!("order deleted");
        Ok(())
    }

    /// Returns one page of orders.
    ///
    /// The page size is a hint passed to the store scan, so a page may hold
    /// more or fewer orders. Index entries whose record is gone are skipped.
    /// Continue with `page.next` until it is the start cursor again.
    #[tracing::instrument(skip(self, ctx), fields(cursor = %request.cursor(), size = request.size()))]
    pub async fn list(
        &self,
        ctx: &OpContext,
        request: PageRequest,
    ) -> Result<OrderPage, RepositoryError> {
        let page = self
            .call(
                ctx,
                "list_scan",
                self.store
                    .scan_set(ORDER_INDEX_KEY, request.cursor().as_u64(), request.size()),
                RepositoryError::Scan,
            )
            .await?;
        let next = Cursor::new(page.next_cursor);

        if page.members.is_empty() {
            return Ok(OrderPage {
                orders: Vec::new(),
                next,
            });
        }

        let values = self
            .call(
                ctx,
                "list_fetch",
                self.store.multi_get(&page.members),
                RepositoryError::Scan,
            )
            .await?;

        let mut orders = Vec::with_capacity(values.len());
        for (key, value) in page.members.iter().zip(values) {
            match value {
                Some(bytes) => orders.push(decode(key, &bytes)?),
                None => warn!(key = %key, "skipping index entry without a stored order"),
            }
        }

        debug!(returned = orders.len(), next = %next, "listed orders");
        Ok(OrderPage { orders, next })
    }

    /// Returns the number of indexed orders.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn count(&self, ctx: &OpContext) -> Result<usize, RepositoryError> {
        self.call(
            ctx,
            "count",
            self.store.set_len(ORDER_INDEX_KEY),
            RepositoryError::Store,
        )
        .await
    }

    /// Runs one store round trip under `ctx`, timing it.
    async fn call<T, F>(
        &self,
        ctx: &OpContext,
        operation: &'static str,
        fut: F,
        map_err: fn(StoreError) -> RepositoryError,
    ) -> Result<T, RepositoryError>
    where
        F: Future<Output = kv_store::Result<T>>,
    {
        let start = Instant::now();
        let result = ctx.run(fut).await;
        metrics::histogram!("order_repository_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        result?.map_err(map_err)
    }
}

fn encode(order: &Order) -> Result<Vec<u8>, RepositoryError> {
    serde_json::to_vec(order).map_err(RepositoryError::Encode)
}

fn decode(key: &str, bytes: &[u8]) -> Result<Order, RepositoryError> {
    serde_json::from_slice(bytes).map_err(|source| RepositoryError::Decode {
        key: key.to_string(),
        source,
    })
}
