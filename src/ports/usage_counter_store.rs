//! UsageCounterStore port - Period-scoped usage counters.
//!
//! Counters are keyed by `(user, feature, period)`, created lazily on the
//! first increment and never decremented or deleted.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::domain::entitlement::FeatureKey;
use crate::domain::foundation::{PeriodKey, UserId};

/// Identifies one counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub user_id: UserId,
    pub feature: FeatureKey,
    pub period: PeriodKey,
}

impl UsageKey {
    pub fn new(user_id: UserId, feature: FeatureKey, period: PeriodKey) -> Self {
        Self {
            user_id,
            feature,
            period,
        }
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user_id, self.feature, self.period)
    }
}

/// Failures reported by counter backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageStoreError {
    /// Lock, serialization or pool contention. Safe to retry.
    #[error("counter contention: {0}")]
    Contention(String),

    /// Backend temporarily unreachable. Safe to retry.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// The increment would overflow the counter.
    #[error("counter overflow")]
    Overflow,

    #[error("counter store error: {0}")]
    Fatal(String),
}

impl UsageStoreError {
    /// True for failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UsageStoreError::Contention(_) | UsageStoreError::Unavailable(_)
        )
    }
}

/// Port for counter storage.
#[async_trait]
pub trait UsageCounterStore: Send + Sync {
    /// Current count, zero when the counter does not exist yet.
    async fn get(&self, key: &UsageKey) -> Result<u64, UsageStoreError>;

    /// Atomically adds `amount` and returns the new count.
    ///
    /// Must be a single upsert-and-add; a read followed by a write loses
    /// concurrent increments.
    async fn increment(&self, key: &UsageKey, amount: u64) -> Result<u64, UsageStoreError>;
}
