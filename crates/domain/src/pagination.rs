//! Cursor-based listing.
//!
//! The public cursor is the store's opaque scan token, passed through
//! unchanged. Cursors are not ordered: the next cursor may be smaller than
//! the current one. `0` starts a scan, and a returned `0` ends it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Order;

/// Default number of orders requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page size accepted.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Errors from parsing listing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0:?}")]
    InvalidCursor(String),

    #[error("page size must be greater than 0")]
    ZeroPageSize,
}

/// Opaque position in a listing scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(u64);

impl Cursor {
    /// The cursor that starts a scan and marks its end.
    pub const START: Cursor = Cursor(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns true for the start/end cursor.
    pub fn is_start(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cursor {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Cursor::START);
        }
        s.parse::<u64>()
            .map(Cursor)
            .map_err(|_| PaginationError::InvalidCursor(s.to_string()))
    }
}

impl From<u64> for Cursor {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Parameters of a single listing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    size: usize,
    cursor: Cursor,
}

impl PageRequest {
    /// Builds a request. A zero size is rejected and large sizes are capped.
    pub fn new(size: usize, cursor: Cursor) -> Result<Self, PaginationError> {
        if size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }
        Ok(Self {
            size: size.min(MAX_PAGE_SIZE),
            cursor,
        })
    }

    /// The first page with the default size.
    pub fn first() -> Self {
        Self {
            size: DEFAULT_PAGE_SIZE,
            cursor: Cursor::START,
        }
    }

    /// Size hint forwarded to the store scan.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of orders and the cursor to continue from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub next: Cursor,
}

impl OrderPage {
    /// Returns true if no further pages remain.
    pub fn is_last(&self) -> bool {
        self.next.is_start()
    }
}
