use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Value};

use crate::{
    BatchOutcome, Result, StoreError, WriteBatch, WriteOp,
    batch::validate_batch,
    store::{KeyValueStore, ScanPage},
};

/// Redis-backed key-value store implementation.
///
/// Wraps a [`ConnectionManager`], which multiplexes commands from any number
/// of tasks over one connection and reconnects transparently. Cloning the
/// store clones the handle, not the connection.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Creates a store from an established connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Connects to the Redis server at `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }

    /// Returns a handle to the underlying connection.
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

/// Converts one `EXEC` reply into an affected count.
///
/// `SET` answers `OK` or nil depending on its `NX`/`XX` condition; the other
/// commands answer an integer.
fn affected_count(command: &'static str, reply: Value) -> Result<u64> {
    match reply {
        Value::Int(n) => Ok(u64::try_from(n).unwrap_or(0)),
        Value::Okay => Ok(1),
        Value::SimpleString(ref s) if s == "OK" => Ok(1),
        Value::Nil => Ok(0),
        other => Err(StoreError::UnexpectedReply {
            command,
            reply: format!("{other:?}"),
        }),
    }
}

#[async_trait]
impl KeyValueStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await?;

        if values.len() != keys.len() {
            return Err(StoreError::UnexpectedReply {
                command: "MGET",
                reply: format!("{} values for {} keys", values.len(), keys.len()),
            });
        }

        Ok(values)
    }

    async fn scan_set(&self, set: &str, cursor: u64, count: usize) -> Result<ScanPage> {
        let mut conn = self.conn.clone();
        let (next_cursor, members): (u64, Vec<String>) = redis::cmd("SSCAN")
            .arg(set)
            .arg(cursor)
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await?;

        tracing::debug!(set, cursor, next_cursor, returned = members.len(), "SSCAN");

        Ok(ScanPage {
            members,
            next_cursor,
        })
    }

    async fn set_len(&self, set: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.scard(set).await?;
        Ok(len)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<BatchOutcome> {
        validate_batch(&batch)?;

        // MULTI/EXEC: queued commands run back to back with no other
        // client's commands in between.
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.ops() {
            match op {
                WriteOp::SetIfAbsent { key, value } => {
                    pipe.cmd("SET").arg(key).arg(value.as_slice()).arg("NX");
                }
                WriteOp::SetIfPresent { key, value } => {
                    pipe.cmd("SET").arg(key).arg(value.as_slice()).arg("XX");
                }
                WriteOp::Set { key, value } => {
                    pipe.cmd("SET").arg(key).arg(value.as_slice());
                }
                WriteOp::Delete { key } => {
                    pipe.cmd("DEL").arg(key);
                }
                WriteOp::SetAdd { set, member } => {
                    pipe.cmd("SADD").arg(set).arg(member);
                }
                WriteOp::SetRemove { set, member } => {
                    pipe.cmd("SREM").arg(set).arg(member);
                }
            }
        }

        let mut conn = self.conn.clone();
        let replies: Vec<Value> = pipe.query_async(&mut conn).await?;

        if replies.len() != batch.len() {
            return Err(StoreError::UnexpectedReply {
                command: "EXEC",
                reply: format!("{} replies for {} commands", replies.len(), batch.len()),
            });
        }

        tracing::debug!(commands = batch.len(), "committed write batch");

        let affected = batch
            .ops()
            .iter()
            .zip(replies)
            .map(|(op, reply)| affected_count(op.command(), reply))
            .collect::<Result<Vec<_>>>()?;

        Ok(BatchOutcome::new(affected))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
