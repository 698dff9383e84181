//! Status transitions.
//!
//! Transitions are pure: they take an order by value and return the
//! transitioned order or a rejection, without touching storage.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{Order, OrderStatus};

/// Rejections produced by a requested status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The requested status is not a transition target.
    #[error("invalid status: {0:?}")]
    InvalidStatus(String),

    /// The order has already been shipped.
    #[error("order has already been shipped")]
    AlreadyShipped,

    /// The order has not been shipped yet, or has already been completed.
    #[error("order has not been shipped yet")]
    NotYetShipped,
}

/// Applies the requested status to `order`, stamping the current time.
pub fn transition(order: Order, status: &str) -> Result<Order, LifecycleError> {
    transition_at(order, status, Utc::now())
}

/// Applies the requested status to `order`, stamping `now`.
///
/// `now` is clamped so it never precedes the order's latest timestamp.
pub fn transition_at(
    order: Order,
    status: &str,
    now: DateTime<Utc>,
) -> Result<Order, LifecycleError> {
    let current = order.status();
    match status.parse::<OrderStatus>()? {
        OrderStatus::Shipped => {
            if !current.can_ship() {
                return Err(LifecycleError::AlreadyShipped);
            }
            let at = now.max(order.created_at());
            Ok(order.ship(at))
        }
        OrderStatus::Completed => {
            if !current.can_complete() {
                return Err(LifecycleError::NotYetShipped);
            }
            let at = order
                .shipped_at()
                .map_or(now, |shipped_at| now.max(shipped_at));
            Ok(order.complete(at))
        }
        OrderStatus::Created => Err(LifecycleError::InvalidStatus(status.to_string())),
    }
}
