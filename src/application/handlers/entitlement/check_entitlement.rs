//! CheckEntitlementHandler - Query handler for feature gating.
//!
//! Gathers the subscriber record and overrides, then delegates to the pure
//! resolver. Never surfaces an error to gating call sites: a missing user or
//! an unreadable store yields the most restrictive decision.

use std::sync::Arc;

use crate::domain::entitlement::{Decision, EntitlementResolver, FeatureKey, Limit};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{OverrideStore, SubscriberReader};

/// Query for a single feature decision.
#[derive(Debug, Clone)]
pub struct CheckEntitlementQuery {
    pub user_id: UserId,
    pub feature: FeatureKey,
}

impl CheckEntitlementQuery {
    pub fn new(user_id: UserId, feature: FeatureKey) -> Self {
        Self { user_id, feature }
    }
}

pub struct CheckEntitlementHandler {
    subscribers: Arc<dyn SubscriberReader>,
    overrides: Arc<dyn OverrideStore>,
    resolver: EntitlementResolver,
}

impl CheckEntitlementHandler {
    pub fn new(
        subscribers: Arc<dyn SubscriberReader>,
        overrides: Arc<dyn OverrideStore>,
        resolver: EntitlementResolver,
    ) -> Self {
        Self {
            subscribers,
            overrides,
            resolver,
        }
    }

    /// Resolves the feature as of now.
    pub async fn handle(&self, query: CheckEntitlementQuery) -> Decision {
        self.handle_at(query, Timestamp::now()).await
    }

    /// Resolves the feature as of `now`.
    pub async fn handle_at(&self, query: CheckEntitlementQuery, now: Timestamp) -> Decision {
        let CheckEntitlementQuery { user_id, feature } = query;

        let subscriber = match self.subscribers.find_subscriber(&user_id).await {
            Ok(Some(subscriber)) => subscriber,
            Ok(None) => {
                tracing::warn!(
                    user_id = %user_id,
                    feature = %feature,
                    "entitlement check for unknown user, denying"
                );
                return Decision::denied();
            }
            Err(error) => {
                tracing::error!(
                    user_id = %user_id,
                    feature = %feature,
                    error = %error,
                    "subscriber lookup failed, denying"
                );
                return Decision::denied();
            }
        };

        let overrides = match self.overrides.get(&user_id).await {
            Ok(overrides) => overrides,
            Err(error) => {
                tracing::error!(
                    user_id = %user_id,
                    feature = %feature,
                    error = %error,
                    "override lookup failed, denying"
                );
                return Decision::denied();
            }
        };

        let decision = self.resolver.resolve(&subscriber, feature, &overrides, now);
        tracing::debug!(
            user_id = %user_id,
            feature = %feature,
            allowed = decision.allowed,
            limit = %decision.limit,
            source = %decision.source,
            "entitlement resolved"
        );
        decision
    }

    /// `hasAccess`: whether the feature is available to the user.
    pub async fn has_access(&self, user_id: &UserId, feature: FeatureKey) -> bool {
        self.handle(CheckEntitlementQuery::new(user_id.clone(), feature))
            .await
            .allowed
    }

    /// `getLimit`: the quota that applies to the user.
    pub async fn get_limit(&self, user_id: &UserId, feature: FeatureKey) -> Limit {
        self.handle(CheckEntitlementQuery::new(user_id.clone(), feature))
            .await
            .limit
    }
}
