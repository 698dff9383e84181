use std::sync::Arc;

use async_trait::async_trait;

use crate::{BatchOutcome, Result, WriteBatch};

/// One page of an incremental set scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Members returned by this call, in store order.
    pub members: Vec<String>,

    /// Cursor to pass to the next call. `0` means the scan is complete.
    pub next_cursor: u64,
}

impl ScanPage {
    /// Returns true if the store signalled the end of the scan.
    pub fn is_complete(&self) -> bool {
        self.next_cursor == 0
    }
}

/// Core trait for key-value store backends.
///
/// Backends hold a shared, concurrency-safe handle to the store and are
/// cheap to clone. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Reads several keys in one round trip.
    ///
    /// The result has the same length and order as `keys`; missing keys
    /// yield `None`.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Performs one step of an incremental scan over the members of `set`.
    ///
    /// `cursor` is the opaque token returned by the previous step, or `0` to
    /// start. `count` is a hint for how many members to return. A full scan
    /// that is not interleaved with writes to the set returns every member at
    /// least once.
    async fn scan_set(&self, set: &str, cursor: u64, count: usize) -> Result<ScanPage>;

    /// Returns the number of members in `set`.
    async fn set_len(&self, set: &str) -> Result<usize>;

    /// Applies a batch of writes as a single atomic unit.
    ///
    /// Returns the affected count of each operation, in batch order.
    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        (**self).multi_get(keys).await
    }

    async fn scan_set(&self, set: &str, cursor: u64, count: usize) -> Result<ScanPage> {
        (**self).scan_set(set, cursor, count).await
    }

    async fn set_len(&self, set: &str) -> Result<usize> {
        (**self).set_len(set).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome> {
        (**self).commit(batch).await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}

/// Extension trait providing convenience methods for key-value stores.
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Checks if a key holds a value.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Unconditionally writes a single value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.commit(WriteBatch::new().set(key, value)).await?;
        Ok(())
    }

    /// Scans `set` to completion and returns every member seen.
    async fn scan_all(&self, set: &str, count: usize) -> Result<Vec<String>> {
        let mut members = Vec::new();
        let mut cursor = 0;
        loop {
            let page = self.scan_set(set, cursor, count).await?;
            members.extend(page.members);
            if page.next_cursor == 0 {
                return Ok(members);
            }
            cursor = page.next_cursor;
        }
    }
}

// Blanket implementation for all KeyValueStore implementations
impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}
