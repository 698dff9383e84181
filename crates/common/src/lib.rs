//! Shared types for the order lifecycle service.

pub mod types;

pub use types::OrderId;
