//! Order status, derived from the order's timestamps.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::LifecycleError;

/// The status of an order in its lifecycle.
///
/// Never stored; always derived from `shipped_at` and `completed_at`:
/// ```text
/// Created ──► Shipped ──► Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, not shipped yet.
    #[default]
    Created,

    /// Shipped, awaiting completion.
    Shipped,

    /// Delivered and closed (terminal state).
    Completed,
}

impl OrderStatus {
    /// Returns true if the order can be shipped in this status.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the order can be completed in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    /// Returns the status as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = LifecycleError;

    /// Parses a wire status. Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "shipped" => Ok(OrderStatus::Shipped),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(LifecycleError::InvalidStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_created() {
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }

    #[test]
    fn test_transitions_allowed_per_status() {
        assert!(OrderStatus::Created.can_ship());
        assert!(!OrderStatus::Shipped.can_ship());
        assert!(!OrderStatus::Completed.can_ship());

        assert!(!OrderStatus::Created.can_complete());
        assert!(OrderStatus::Shipped.can_complete());
        assert!(!OrderStatus::Completed.can_complete());
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert_eq!(
            "Shipped".parse::<OrderStatus>(),
            Err(LifecycleError::InvalidStatus("Shipped".to_string()))
        );
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for status in [
            OrderStatus::Created,
            OrderStatus::Shipped,
            OrderStatus::Completed,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
    }
}
