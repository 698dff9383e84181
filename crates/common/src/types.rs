use std::num::ParseIntError;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Unique identifier for an order.
///
/// Serialized as a bare JSON integer. Generated ids stay within the
/// non-negative `i64` range so that clients decoding into signed integers
/// never see a wrapped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    /// Creates an order ID from a raw integer.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generates a random order ID.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(0..=i64::MAX as u64))
    }

    /// Returns the underlying integer.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<OrderId> for u64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}
