//! Order entity, status lifecycle and service.

mod entity;
mod lifecycle;
mod service;
mod status;
mod value_objects;

pub use entity::Order;
pub use lifecycle::{LifecycleError, transition, transition_at};
pub use service::OrderService;
pub use status::OrderStatus;
pub use value_objects::{CustomerId, ItemId, LineItem};

use thiserror::Error;

/// Errors raised when an order would violate its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// A line item has a zero quantity.
    #[error("Invalid quantity {quantity} for item {item_id} (must be greater than 0)")]
    InvalidQuantity { item_id: ItemId, quantity: u32 },

    /// `completed_at` is set without `shipped_at`.
    #[error("Order completed without being shipped")]
    CompletedWithoutShipment,

    /// `shipped_at` precedes `created_at`.
    #[error("Order shipped before it was created")]
    ShippedBeforeCreated,

    /// `completed_at` precedes `shipped_at`.
    #[error("Order completed before it was shipped")]
    CompletedBeforeShipped,
}
