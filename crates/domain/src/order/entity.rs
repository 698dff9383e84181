//! Order entity.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{CustomerId, LineItem, OrderError, OrderStatus};

/// A customer purchase order.
///
/// An `Order` is valid by construction: line item quantities are positive,
/// `completed_at` is only set when `shipped_at` is, and the timestamps never
/// go backwards. Decoding a stored record runs the same checks, so corrupted
/// data is rejected at the boundary instead of flowing through the system.
///
/// The status is not a field; it is derived from the timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderRecord")]
pub struct Order {
    #[serde(rename = "order_id")]
    id: OrderId,
    customer_id: CustomerId,
    line_items: Vec<LineItem>,
    created_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

/// The stored shape of an order, before validation.
#[derive(Deserialize)]
struct OrderRecord {
    order_id: OrderId,
    customer_id: CustomerId,
    #[serde(default)]
    line_items: Option<Vec<LineItem>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    shipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRecord> for Order {
    type Error = OrderError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let order = Order {
            id: record.order_id,
            customer_id: record.customer_id,
            line_items: record.line_items.unwrap_or_default(),
            created_at: record.created_at,
            shipped_at: record.shipped_at,
            completed_at: record.completed_at,
        };
        order.check()?;
        Ok(order)
    }
}

impl Order {
    /// Creates a new order in the `Created` status.
    pub fn new(
        id: OrderId,
        customer_id: CustomerId,
        line_items: Vec<LineItem>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let order = Order {
            id,
            customer_id,
            line_items,
            created_at,
            shipped_at: None,
            completed_at: None,
        };
        order.check()?;
        Ok(order)
    }

    /// Returns the same order under a different id.
    pub fn with_id(mut self, id: OrderId) -> Self {
        self.id = id;
        self
    }

    fn check(&self) -> Result<(), OrderError> {
        if let Some(item) = self.line_items.iter().find(|item| item.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                item_id: item.item_id,
                quantity: item.quantity,
            });
        }

        match (self.shipped_at, self.completed_at) {
            (None, Some(_)) => Err(OrderError::CompletedWithoutShipment),
            (Some(shipped_at), _) if shipped_at < self.created_at => {
                Err(OrderError::ShippedBeforeCreated)
            }
            (Some(shipped_at), Some(completed_at)) if completed_at < shipped_at => {
                Err(OrderError::CompletedBeforeShipped)
            }
            _ => Ok(()),
        }
    }

    /// Marks the order shipped. Callers go through the lifecycle rules.
    pub(super) fn ship(mut self, at: DateTime<Utc>) -> Self {
        self.shipped_at = Some(at);
        self
    }

    /// Marks the order completed. Callers go through the lifecycle rules.
    pub(super) fn complete(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the line items in the order they were placed.
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the status derived from the timestamps.
    pub fn status(&self) -> OrderStatus {
        match (self.shipped_at, self.completed_at) {
            (None, _) => OrderStatus::Created,
            (Some(_), None) => OrderStatus::Shipped,
            (Some(_), Some(_)) => OrderStatus::Completed,
        }
    }

    /// Returns the sum of all line totals, or None on overflow.
    pub fn total(&self) -> Option<u64> {
        self.line_items
            .iter()
            .try_fold(0u64, |acc, item| acc.checked_add(item.total()?))
    }
}
