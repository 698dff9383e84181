//! Domain error types.

use common::OrderId;
use kv_store::StoreError;
use thiserror::Error;

use crate::context::Interrupted;
use crate::order::{LifecycleError, OrderError};

/// Errors returned by the order repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No order is stored under the id.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An order is already stored under the id.
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),

    /// The order passed to an update carries a different id than the target.
    #[error("Order id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: OrderId, actual: OrderId },

    /// A stored value is not a valid order encoding.
    #[error("Failed to decode order at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode order: {0}")]
    Encode(#[source] serde_json::Error),

    /// The store rejected or failed a read or write.
    #[error("Store error: {0}")]
    Store(#[source] StoreError),

    /// The index scan or the batched lookup behind a listing failed.
    #[error("Scan failed: {0}")]
    Scan(#[source] StoreError),

    #[error("Operation canceled")]
    Canceled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for RepositoryError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Canceled => RepositoryError::Canceled,
            Interrupted::DeadlineExceeded => RepositoryError::DeadlineExceeded,
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A requested status transition was rejected.
    #[error("Invalid transition: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// The order would violate its invariants.
    #[error("Invalid order: {0}")]
    Order(#[from] OrderError),
}
