//! UsageCounterService - Metered feature consumption.
//!
//! Wraps a [`UsageCounterStore`] with argument checks and bounded retries.
//! Every failure path is fail-closed: a counter that cannot be read or
//! written is treated as over its limit.

use std::sync::Arc;

use super::retry::{with_retry, RetryConfig, RetryFailure};
use crate::domain::entitlement::{EntitlementError, FeatureKey, FeatureKind, Limit};
use crate::domain::foundation::{PeriodKey, UserId, ValidationError};
use crate::ports::{UsageCounterStore, UsageKey, UsageStoreError};

pub struct UsageCounterService {
    store: Arc<dyn UsageCounterStore>,
    retry: RetryConfig,
}

impl UsageCounterService {
    pub fn new(store: Arc<dyn UsageCounterStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Current usage for a period. Zero when nothing has been recorded.
    pub async fn get_usage(
        &self,
        user_id: &UserId,
        feature: FeatureKey,
        period: PeriodKey,
    ) -> Result<u64, EntitlementError> {
        feature.expect_kind(FeatureKind::Limit)?;
        let key = UsageKey::new(user_id.clone(), feature, period);

        with_retry(&self.retry, UsageStoreError::is_transient, || self.store.get(&key))
            .await
            .map_err(|failure| EntitlementError::infrastructure(failure.error.to_string()))
    }

    /// Adds `amount` to the counter and returns the new count.
    ///
    /// # Errors
    ///
    /// - `Validation` if `amount` is zero or the feature is not metered
    /// - `CounterUpdate` if the store could not apply the increment
    pub async fn increment(
        &self,
        user_id: &UserId,
        feature: FeatureKey,
        period: PeriodKey,
        amount: u64,
    ) -> Result<u64, EntitlementError> {
        feature.expect_kind(FeatureKind::Limit)?;
        if amount == 0 {
            return Err(ValidationError::out_of_range("amount", 1, i64::MAX, 0).into());
        }
        let key = UsageKey::new(user_id.clone(), feature, period);

        let result = with_retry(&self.retry, UsageStoreError::is_transient, || {
            self.store.increment(&key, amount)
        })
        .await;

        match result {
            Ok(count) => {
                tracing::debug!(counter = %key, amount, count, "usage recorded");
                Ok(count)
            }
            Err(RetryFailure { attempts, error }) => {
                tracing::error!(
                    counter = %key,
                    amount,
                    attempts,
                    error = %error,
                    "usage counter update failed"
                );
                Err(EntitlementError::counter_update(attempts, error.to_string()))
            }
        }
    }

    /// True if usage is still below `limit`.
    ///
    /// Unlimited always passes without touching the store. Read failures
    /// report `false`.
    pub async fn check_within_limit(
        &self,
        user_id: &UserId,
        feature: FeatureKey,
        period: PeriodKey,
        limit: Limit,
    ) -> bool {
        if limit.is_unlimited() {
            return true;
        }

        match self.get_usage(user_id, feature, period).await {
            Ok(used) => limit.permits(used),
            Err(error) => {
                tracing::warn!(
                    user_id = %user_id,
                    feature = %feature,
                    period = %period,
                    error = %error,
                    "usage read failed, treating as over limit"
                );
                false
            }
        }
    }
}
