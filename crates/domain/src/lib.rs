//! Domain layer for the order service.
//!
//! This crate provides:
//! - the Order entity with its timestamp-derived status
//! - pure lifecycle transitions (`shipped`, `completed`)
//! - the OrderRepository over any key-value store, with cursor listing
//! - OrderService, tying ids, clocks and transitions together
//! - OpContext for cancellation and deadlines on every store call

pub mod context;
pub mod error;
pub mod order;
pub mod pagination;
pub mod repository;

pub use context::{Interrupted, OpContext};
pub use error::{DomainError, RepositoryError};
pub use order::{
    CustomerId, ItemId, LifecycleError, LineItem, Order, OrderError, OrderService, OrderStatus,
    transition, transition_at,
};
pub use pagination::{Cursor, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, OrderPage, PageRequest, PaginationError};
pub use repository::{ORDER_INDEX_KEY, ORDER_KEY_PREFIX, OrderRepository, order_key};
