use thiserror::Error;

/// Errors that can occur when interacting with the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The Redis client or server reported an error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend refused the operation without applying it.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with a reply that does not fit the command.
    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply {
        command: &'static str,
        reply: String,
    },

    /// The write batch was rejected before reaching the store.
    #[error("Invalid write batch: {0}")]
    InvalidBatch(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
