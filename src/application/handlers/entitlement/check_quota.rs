//! CheckQuotaHandler - Resolved limit plus current usage for a metered feature.

use serde::Serialize;
use std::sync::Arc;

use super::check_entitlement::{CheckEntitlementHandler, CheckEntitlementQuery};
use crate::application::services::UsageCounterService;
use crate::domain::entitlement::{DecisionSource, EntitlementError, FeatureKey, FeatureKind, Limit};
use crate::domain::foundation::{PeriodKey, Timestamp, UserId};

#[derive(Debug, Clone)]
pub struct CheckQuotaQuery {
    pub user_id: UserId,
    pub feature: FeatureKey,
    /// Defaults to the period containing now.
    pub period: Option<PeriodKey>,
}

/// Quota state for one metered feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub feature: FeatureKey,
    pub period: PeriodKey,
    pub limit: Limit,
    pub source: DecisionSource,
    /// `None` when usage could not be read.
    pub used: Option<u64>,
    /// Units left before the cap. `None` when unlimited or unreadable.
    pub remaining: Option<u64>,
    pub within_limit: bool,
}

pub struct CheckQuotaHandler {
    entitlements: Arc<CheckEntitlementHandler>,
    counters: Arc<UsageCounterService>,
}

impl CheckQuotaHandler {
    pub fn new(
        entitlements: Arc<CheckEntitlementHandler>,
        counters: Arc<UsageCounterService>,
    ) -> Self {
        Self {
            entitlements,
            counters,
        }
    }

    /// # Errors
    ///
    /// `Validation` if the feature is a boolean flag.
    pub async fn handle(&self, query: CheckQuotaQuery) -> Result<QuotaStatus, EntitlementError> {
        query.feature.expect_kind(FeatureKind::Limit)?;
        let now = Timestamp::now();
        let period = query.period.unwrap_or_else(|| now.period_key());

        let decision = self
            .entitlements
            .handle_at(
                CheckEntitlementQuery::new(query.user_id.clone(), query.feature),
                now,
            )
            .await;

        let used = match self
            .counters
            .get_usage(&query.user_id, query.feature, period)
            .await
        {
            Ok(used) => Some(used),
            Err(error) => {
                tracing::warn!(
                    user_id = %query.user_id,
                    feature = %query.feature,
                    error = %error,
                    "usage read failed, reporting over limit"
                );
                None
            }
        };

        let within_limit = match used {
            Some(used) => decision.limit.permits(used),
            None => false,
        };

        Ok(QuotaStatus {
            feature: query.feature,
            period,
            limit: decision.limit,
            source: decision.source,
            used,
            remaining: used.and_then(|used| decision.limit.remaining(used)),
            within_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryOverrideStore, InMemorySubscriberReader, InMemoryUsageCounterStore,
    };
    use crate::application::services::RetryConfig;
    use crate::domain::entitlement::{
        EntitlementResolver, Subscriber, SubscriptionStatus, TierCatalog, TierId,
    };

    fn user() -> UserId {
        UserId::new("user-basic").unwrap()
    }

    fn handler() -> (CheckQuotaHandler, Arc<UsageCounterService>) {
        let now = Timestamp::now();
        let subscribers = Arc::new(InMemorySubscriberReader::with_subscribers([Subscriber {
            user_id: user(),
            tier_id: TierId::new("basic").unwrap(),
            status: SubscriptionStatus::Active,
            period_start: now.add_days(-1),
            period_end: now.add_days(29),
        }]));
        let entitlements = Arc::new(CheckEntitlementHandler::new(
            subscribers,
            Arc::new(InMemoryOverrideStore::new()),
            EntitlementResolver::new(Arc::new(TierCatalog::standard())),
        ));
        let counters = Arc::new(UsageCounterService::new(
            Arc::new(InMemoryUsageCounterStore::new()),
            RetryConfig::immediate(3),
        ));
        (CheckQuotaHandler::new(entitlements, counters.clone()), counters)
    }

    #[tokio::test]
    async fn reports_usage_against_tier_limit() {
        let (handler, counters) = handler();
        let period = Timestamp::now().period_key();
        counters
            .increment(&user(), FeatureKey::MaxMealPlansPerMonth, period, 4)
            .await
            .unwrap();

        let status = handler
            .handle(CheckQuotaQuery {
                user_id: user(),
                feature: FeatureKey::MaxMealPlansPerMonth,
                period: None,
            })
            .await
            .unwrap();

        assert_eq!(status.limit, Limit::Capped(10));
        assert_eq!(status.used, Some(4));
        assert_eq!(status.remaining, Some(6));
        assert!(status.within_limit);
    }

    #[tokio::test]
    async fn flag_features_have_no_quota() {
        let (handler, _) = handler();
        let result = handler
            .handle(CheckQuotaQuery {
                user_id: user(),
                feature: FeatureKey::CoachMessaging,
                period: None,
            })
            .await;
        assert!(matches!(result, Err(EntitlementError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_user_is_never_within_limit() {
        let (handler, _) = handler();
        let status = handler
            .handle(CheckQuotaQuery {
                user_id: UserId::new("ghost").unwrap(),
                feature: FeatureKey::MaxMealPlansPerMonth,
                period: None,
            })
            .await
            .unwrap();

        assert_eq!(status.limit, Limit::Capped(0));
        assert!(!status.within_limit);
    }
}
