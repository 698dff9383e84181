//! Key-value store abstraction for the order lifecycle service.
//!
//! Exposes the handful of store primitives the order repository is built
//! from: point reads, positional multi-get, incremental set scans and
//! atomic write batches. Redis is the production backend; the in-memory
//! backend reproduces its semantics for tests and local runs.

pub mod batch;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use batch::{BatchOutcome, WriteBatch, WriteOp};
pub use error::{Result, StoreError};
pub use memory::InMemoryKvStore;
pub use redis_store::RedisKvStore;
pub use store::{KeyValueStore, KeyValueStoreExt, ScanPage};
