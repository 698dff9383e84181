//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Which key-value store backs the order repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local store; data does not survive a restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `SERVER_PORT` or `PORT`: listen port (default: `3000`)
/// - `REDIS_ADDRESS`: Redis host and port, with or without the `redis://`
///   scheme (default: `"localhost:6379"`)
/// - `REQUEST_TIMEOUT_MS`: per-request store deadline (default: `5000`)
/// - `STORE_BACKEND`: `redis` or `memory` (default: `redis`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
///
/// Values that fail to parse fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub redis_address: String,
    pub request_timeout_ms: u64,
    pub store_backend: StoreBackend,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("SERVER_PORT")
                .or_else(|| var("PORT"))
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            redis_address: var("REDIS_ADDRESS").unwrap_or(defaults.redis_address),
            request_timeout_ms: var("REQUEST_TIMEOUT_MS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
            store_backend: var("STORE_BACKEND")
                .and_then(|b| b.parse().ok())
                .unwrap_or(defaults.store_backend),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the Redis connection URL.
    pub fn redis_url(&self) -> String {
        if self.redis_address.contains("://") {
            self.redis_address.clone()
        } else {
            format!("redis://{}", self.redis_address)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            redis_address: "localhost:6379".to_string(),
            request_timeout_ms: 5000,
            store_backend: StoreBackend::Redis,
            log_level: "info".to_string(),
        }
    }
}
