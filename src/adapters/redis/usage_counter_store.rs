//! Redis-backed usage counter store for multi-server deployments.
//!
//! One string key per counter, incremented with `INCRBY`, which is atomic on
//! the server. Keys carry no expiry: counters are never deleted, a new
//! period simply starts a new key.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ErrorKind, RedisError};

use crate::ports::{UsageCounterStore, UsageKey, UsageStoreError};

/// Default namespace for counter keys.
pub const DEFAULT_KEY_PREFIX: &str = "entitlements";

#[derive(Clone)]
pub struct RedisUsageCounterStore {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisUsageCounterStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(conn: MultiplexedConnection, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    fn redis_key(&self, key: &UsageKey) -> String {
        counter_key(&self.prefix, key)
    }
}

fn counter_key(prefix: &str, key: &UsageKey) -> String {
    format!(
        "{}:usage:{}:{}:{}",
        prefix, key.user_id, key.feature, key.period
    )
}

fn classify(err: RedisError) -> UsageStoreError {
    if err.is_timeout() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        return UsageStoreError::Unavailable(err.to_string());
    }
    match err.kind() {
        ErrorKind::TryAgain | ErrorKind::BusyLoadingError | ErrorKind::ClusterDown => {
            UsageStoreError::Contention(err.to_string())
        }
        _ if err.to_string().contains("overflow") => UsageStoreError::Overflow,
        _ => UsageStoreError::Fatal(err.to_string()),
    }
}

fn to_count(raw: i64, key: &UsageKey) -> Result<u64, UsageStoreError> {
    u64::try_from(raw).map_err(|_| UsageStoreError::Fatal(format!("negative count {} for {}", raw, key)))
}

#[async_trait]
impl UsageCounterStore for RedisUsageCounterStore {
    async fn get(&self, key: &UsageKey) -> Result<u64, UsageStoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<i64> = conn.get(self.redis_key(key)).await.map_err(classify)?;
        raw.map(|raw| to_count(raw, key)).unwrap_or(Ok(0))
    }

    async fn increment(&self, key: &UsageKey, amount: u64) -> Result<u64, UsageStoreError> {
        let amount = i64::try_from(amount).map_err(|_| UsageStoreError::Overflow)?;
        let mut conn = self.conn.clone();
        let count: i64 = conn
            .incr(self.redis_key(key), amount)
            .await
            .map_err(classify)?;
        to_count(count, key)
    }
}
