use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    BatchOutcome, Result, StoreError, WriteBatch, WriteOp,
    batch::validate_batch,
    store::{KeyValueStore, ScanPage},
};

/// Number of hash buckets a set is laid out over. Must be a power of two.
const BUCKET_COUNT: u64 = 1024;
const BUCKET_MASK: u64 = BUCKET_COUNT - 1;

/// Set members grouped by hash bucket. Only non-empty buckets are kept.
type BucketedSet = BTreeMap<u64, BTreeSet<String>>;

#[derive(Default)]
struct State {
    values: HashMap<String, Vec<u8>>,
    sets: HashMap<String, BucketedSet>,
    failing_commits: usize,
}

impl State {
    fn apply(&mut self, op: WriteOp) -> u64 {
        match op {
            WriteOp::SetIfAbsent { key, value } => {
                if self.values.contains_key(&key) {
                    return 0;
                }
                self.values.insert(key, value);
                1
            }
            WriteOp::SetIfPresent { key, value } => match self.values.get_mut(&key) {
                Some(slot) => {
                    *slot = value;
                    1
                }
                None => 0,
            },
            WriteOp::Set { key, value } => {
                self.values.insert(key, value);
                1
            }
            WriteOp::Delete { key } => {
                let removed_value = self.values.remove(&key).is_some();
                let removed_set = self.sets.remove(&key).is_some();
                u64::from(removed_value || removed_set)
            }
            WriteOp::SetAdd { set, member } => {
                let bucket = bucket_of(&member);
                let added = self
                    .sets
                    .entry(set)
                    .or_default()
                    .entry(bucket)
                    .or_default()
                    .insert(member);
                u64::from(added)
            }
            WriteOp::SetRemove { set, member } => {
                let Some(buckets) = self.sets.get_mut(&set) else {
                    return 0;
                };
                let bucket = bucket_of(&member);
                let removed = buckets
                    .get_mut(&bucket)
                    .is_some_and(|members| members.remove(&member));
                if buckets.get(&bucket).is_some_and(BTreeSet::is_empty) {
                    buckets.remove(&bucket);
                }
                // Empty sets disappear, as they do in Redis.
                if buckets.is_empty() {
                    self.sets.remove(&set);
                }
                u64::from(removed)
            }
        }
    }
}

fn bucket_of(member: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    member.hash(&mut hasher);
    hasher.finish() & BUCKET_MASK
}

/// Advances a scan cursor the way Redis does: increment the reversed bits.
///
/// Visiting buckets in this order is what makes the cursor opaque and
/// non-monotonic.
fn next_cursor(cursor: u64) -> u64 {
    let mut v = cursor | !BUCKET_MASK;
    v = v.reverse_bits();
    v = v.wrapping_add(1);
    v.reverse_bits()
}

/// In-memory key-value store implementation for testing.
///
/// Mirrors the Redis semantics the order repository relies on: atomic
/// batches, conditional writes, and set scans driven by an opaque
/// bucket cursor. Sets are laid out over a fixed bucket table, so a full
/// scan of a set that is not modified meanwhile returns every member
/// exactly once.
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryKvStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` commits fail with [`StoreError::Unavailable`]
    /// without applying any of their operations.
    pub async fn fail_next_commits(&self, count: usize) {
        self.state.write().await.failing_commits = count;
    }

    /// Returns the number of plain keys stored (sets excluded).
    pub async fn key_count(&self) -> usize {
        self.state.read().await.values.len()
    }

    /// Clears all keys and sets.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.values.clear();
        state.sets.clear();
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state.read().await;
        Ok(state.values.get(key).cloned())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let state = self.state.read().await;
        Ok(keys.iter().map(|k| state.values.get(k).cloned()).collect())
    }

    async fn scan_set(&self, set: &str, cursor: u64, count: usize) -> Result<ScanPage> {
        let state = self.state.read().await;
        let Some(buckets) = state.sets.get(set) else {
            return Ok(ScanPage::default());
        };

        let count = count.max(1);
        let mut cursor = cursor & BUCKET_MASK;
        let mut members = Vec::new();

        loop {
            if let Some(bucket) = buckets.get(&cursor) {
                // Buckets are returned whole; stop before one would overflow
                // the page unless nothing has been collected yet.
                if !members.is_empty() && members.len() + bucket.len() > count {
                    break;
                }
                members.extend(bucket.iter().cloned());
            }

            cursor = next_cursor(cursor);
            if cursor == 0 || members.len() >= count {
                break;
            }
        }

        Ok(ScanPage {
            members,
            next_cursor: cursor,
        })
    }

    async fn set_len(&self, set: &str) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .sets
            .get(set)
            .map(|buckets| buckets.values().map(BTreeSet::len).sum())
            .unwrap_or(0))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome> {
        validate_batch(&batch)?;

        let mut state = self.state.write().await;

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(StoreError::Unavailable(
                "injected commit failure".to_string(),
            ));
        }

        // Holding the write lock for the whole batch is what makes it atomic.
        let affected = batch
            .into_ops()
            .into_iter()
            .map(|op| state.apply(op))
            .collect();

        Ok(BatchOutcome::new(affected))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
