//! Atomic write batches.

/// A single write inside a [`WriteBatch`].
///
/// Every operation reports an "affected" count once committed, which is how
/// callers observe the outcome of the conditional writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Writes the value only if the key holds nothing (1 if written, else 0).
    SetIfAbsent { key: String, value: Vec<u8> },

    /// Overwrites the value only if the key already exists (1 if written, else 0).
    SetIfPresent { key: String, value: Vec<u8> },

    /// Unconditionally writes the value (always 1).
    Set { key: String, value: Vec<u8> },

    /// Removes the key (number of keys removed).
    Delete { key: String },

    /// Adds a member to a set (number of members added).
    SetAdd { set: String, member: String },

    /// Removes a member from a set (number of members removed).
    SetRemove { set: String, member: String },
}

impl WriteOp {
    /// Returns the store command this operation maps to.
    pub fn command(&self) -> &'static str {
        match self {
            WriteOp::SetIfAbsent { .. } | WriteOp::SetIfPresent { .. } | WriteOp::Set { .. } => {
                "SET"
            }
            WriteOp::Delete { .. } => "DEL",
            WriteOp::SetAdd { .. } => "SADD",
            WriteOp::SetRemove { .. } => "SREM",
        }
    }
}

/// A group of writes applied as a single atomic unit.
///
/// Either every operation is applied or none is, as observed by any
/// subsequent read.
///
/// # Example
///
/// ```
/// use kv_store::WriteBatch;
///
/// let batch = WriteBatch::new()
///     .set_if_absent("order:1", b"{}".to_vec())
///     .set_add("orders", "order:1");
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation.
    pub fn push(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn set_if_absent(self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.push(WriteOp::SetIfAbsent {
            key: key.into(),
            value,
        })
    }

    pub fn set_if_present(self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.push(WriteOp::SetIfPresent {
            key: key.into(),
            value,
        })
    }

    pub fn set(self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.push(WriteOp::Set {
            key: key.into(),
            value,
        })
    }

    pub fn delete(self, key: impl Into<String>) -> Self {
        self.push(WriteOp::Delete { key: key.into() })
    }

    pub fn set_add(self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.push(WriteOp::SetAdd {
            set: set.into(),
            member: member.into(),
        })
    }

    pub fn set_remove(self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.push(WriteOp::SetRemove {
            set: set.into(),
            member: member.into(),
        })
    }

    /// Returns the operations in commit order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Per-operation results of a committed batch, aligned with its operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    affected: Vec<u64>,
}

impl BatchOutcome {
    pub fn new(affected: Vec<u64>) -> Self {
        Self { affected }
    }

    /// Returns the affected count of the operation at `index`.
    pub fn affected(&self, index: usize) -> Option<u64> {
        self.affected.get(index).copied()
    }

    /// Returns true if the operation at `index` changed anything.
    pub fn applied(&self, index: usize) -> bool {
        self.affected(index).is_some_and(|n| n > 0)
    }

    pub fn len(&self) -> usize {
        self.affected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }
}

/// Validates a batch before it is sent to a backend.
pub fn validate_batch(batch: &WriteBatch) -> crate::Result<()> {
    if batch.is_empty() {
        return Err(crate::StoreError::InvalidBatch(
            "cannot commit an empty batch".to_string(),
        ));
    }

    for op in batch.ops() {
        let key = match op {
            WriteOp::SetIfAbsent { key, .. }
            | WriteOp::SetIfPresent { key, .. }
            | WriteOp::Set { key, .. }
            | WriteOp::Delete { key } => key,
            WriteOp::SetAdd { set, .. } | WriteOp::SetRemove { set, .. } => set,
        };
        if key.is_empty() {
            return Err(crate::StoreError::InvalidBatch(format!(
                "{} with an empty key",
                op.command()
            )));
        }
    }

    Ok(())
}
