//! In-memory usage counter store.
//!
//! Each counter is an `AtomicU64`; increments use a compare-and-swap loop
//! with overflow checking, so concurrent callers never lose updates.
//! Suitable for tests and single-process deployments. Counts do not survive
//! a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{UsageCounterStore, UsageKey, UsageStoreError};

#[derive(Default)]
pub struct InMemoryUsageCounterStore {
    counters: RwLock<HashMap<UsageKey, Arc<AtomicU64>>>,
}

impl InMemoryUsageCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of counters created so far.
    pub async fn len(&self) -> usize {
        self.counters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.counters.read().await.is_empty()
    }

    async fn counter(&self, key: &UsageKey) -> Arc<AtomicU64> {
        if let Some(counter) = self.counters.read().await.get(key) {
            return Arc::clone(counter);
        }
        let mut counters = self.counters.write().await;
        Arc::clone(counters.entry(key.clone()).or_default())
    }
}

#[async_trait]
impl UsageCounterStore for InMemoryUsageCounterStore {
    async fn get(&self, key: &UsageKey) -> Result<u64, UsageStoreError> {
        Ok(self
            .counters
            .read()
            .await
            .get(key)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0))
    }

    async fn increment(&self, key: &UsageKey, amount: u64) -> Result<u64, UsageStoreError> {
        let counter = self.counter(key).await;
        let previous = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_add(amount))
            .map_err(|_| UsageStoreError::Overflow)?;
        Ok(previous + amount)
    }
}
