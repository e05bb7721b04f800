//! Entitlement resolution.
//!
//! Resolution is a pure function of its inputs. Precedence, highest first:
//!
//! 1. An explicit per-user override for the feature, regardless of
//!    subscription state.
//! 2. The subscriber's tier default, while the subscription is active and
//!    the billing period contains `now`.
//! 3. The lowest-ranked tier in the catalog.

use std::sync::Arc;

use super::{
    Decision, DecisionSource, FeatureKey, FeatureKind, FeatureOverrides, Subscriber, Tier,
    TierCatalog,
};
use crate::domain::foundation::Timestamp;

/// Resolves one feature for one subscriber.
pub fn resolve(
    subscriber: &Subscriber,
    feature: FeatureKey,
    overrides: &FeatureOverrides,
    catalog: &TierCatalog,
    now: Timestamp,
) -> Decision {
    if let Some(decision) = from_override(feature, overrides) {
        return decision;
    }

    if subscriber.is_current(now) {
        if let Some(tier) = catalog.get_tier(&subscriber.tier_id) {
            return from_tier(feature, tier, DecisionSource::Tier);
        }
    }

    from_tier(feature, catalog.lowest(), DecisionSource::Default)
}

fn from_override(feature: FeatureKey, overrides: &FeatureOverrides) -> Option<Decision> {
    match feature.kind() {
        FeatureKind::Flag => overrides
            .flag(feature)
            .map(|enabled| Decision::for_flag(enabled, DecisionSource::Override)),
        FeatureKind::Limit => overrides
            .limit(feature)
            .map(|limit| Decision::for_limit(limit, DecisionSource::Override)),
    }
}

fn from_tier(feature: FeatureKey, tier: &Tier, source: DecisionSource) -> Decision {
    match feature.kind() {
        FeatureKind::Flag => Decision::for_flag(tier.flag_default(feature), source),
        FeatureKind::Limit => Decision::for_limit(tier.limit_default(feature), source),
    }
}

/// Resolver bound to an injected, immutable catalog.
#[derive(Debug, Clone)]
pub struct EntitlementResolver {
    catalog: Arc<TierCatalog>,
}

impl EntitlementResolver {
    pub fn new(catalog: Arc<TierCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    pub fn resolve(
        &self,
        subscriber: &Subscriber,
        feature: FeatureKey,
        overrides: &FeatureOverrides,
        now: Timestamp,
    ) -> Decision {
        resolve(subscriber, feature, overrides, &self.catalog, now)
    }
}
