//! Subscription tier definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{FeatureKey, Limit};
use crate::domain::foundation::ValidationError;

/// Identifier of a subscription tier, e.g. `premium`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TierId(String);

impl TierId {
    /// Creates a tier id, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("tier_id"));
        }
        Ok(Self(id))
    }

    /// Builds an id from a compile-time literal known to be non-empty.
    pub(crate) fn from_static(id: &'static str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TierId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TierId> for String {
    fn from(id: TierId) -> Self {
        id.0
    }
}

/// A ranked subscription level.
///
/// Higher rank is expected to be a superset of lower-rank privileges. This is
/// catalog authoring discipline, checked by
/// [`TierCatalog::monotonicity_violations`](super::TierCatalog::monotonicity_violations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: TierId,
    pub name: String,
    pub rank: u32,
    /// Default availability of boolean features.
    #[serde(default)]
    pub feature_defaults: BTreeMap<FeatureKey, bool>,
    /// Default numeric quotas.
    #[serde(default)]
    pub limit_defaults: BTreeMap<FeatureKey, Limit>,
}

impl Tier {
    /// Creates a tier with no defaults.
    pub fn new(id: TierId, name: impl Into<String>, rank: u32) -> Self {
        Self {
            id,
            name: name.into(),
            rank,
            feature_defaults: BTreeMap::new(),
            limit_defaults: BTreeMap::new(),
        }
    }

    pub fn with_feature(mut self, key: FeatureKey, enabled: bool) -> Self {
        self.feature_defaults.insert(key, enabled);
        self
    }

    pub fn with_limit(mut self, key: FeatureKey, limit: Limit) -> Self {
        self.limit_defaults.insert(key, limit);
        self
    }

    /// Default availability of a boolean feature. Absent keys are unavailable.
    pub fn flag_default(&self, key: FeatureKey) -> bool {
        self.feature_defaults.get(&key).copied().unwrap_or(false)
    }

    /// Default quota for a numeric feature. Absent keys are capped at zero.
    pub fn limit_default(&self, key: FeatureKey) -> Limit {
        self.limit_defaults.get(&key).copied().unwrap_or(Limit::DISABLED)
    }
}
