//! Feature registry.
//!
//! The registry is the contract between the engine and every feature-gated
//! surface. Each key carries its kind, the minimum tier rank expected to
//! include it, and a human description. Keys outside this enumeration are
//! rejected at the override boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Version of the feature registry. Bumped whenever a key is added or removed.
pub const REGISTRY_VERSION: u32 = 3;

/// A gated feature or quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureKey {
    AdvancedAnalytics,
    CoachMessaging,
    CustomMealPlans,
    WearableSync,
    ProgressPhotos,
    PrioritySupport,
    ExportReports,
    MaxMealPlansPerMonth,
    MaxWorkoutPlansPerMonth,
    MaxCoachMessagesPerMonth,
    MaxProgressPhotosPerMonth,
}

/// Whether a feature is gated by a boolean or metered by a numeric limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Flag,
    Limit,
}

impl FeatureKind {
    /// Human name of the value type this kind expects.
    pub fn value_type(&self) -> &'static str {
        match self {
            FeatureKind::Flag => "boolean",
            FeatureKind::Limit => "integer limit",
        }
    }
}

/// Registry annotation for a single feature key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureDescriptor {
    pub key: FeatureKey,
    pub kind: FeatureKind,
    /// Lowest tier rank expected to include the feature.
    pub min_rank: u32,
    pub description: &'static str,
}

impl FeatureKey {
    /// Every registered key, in registry order.
    pub const ALL: [FeatureKey; 11] = [
        FeatureKey::AdvancedAnalytics,
        FeatureKey::CoachMessaging,
        FeatureKey::CustomMealPlans,
        FeatureKey::WearableSync,
        FeatureKey::ProgressPhotos,
        FeatureKey::PrioritySupport,
        FeatureKey::ExportReports,
        FeatureKey::MaxMealPlansPerMonth,
        FeatureKey::MaxWorkoutPlansPerMonth,
        FeatureKey::MaxCoachMessagesPerMonth,
        FeatureKey::MaxProgressPhotosPerMonth,
    ];

    /// Wire name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::AdvancedAnalytics => "advancedAnalytics",
            FeatureKey::CoachMessaging => "coachMessaging",
            FeatureKey::CustomMealPlans => "customMealPlans",
            FeatureKey::WearableSync => "wearableSync",
            FeatureKey::ProgressPhotos => "progressPhotos",
            FeatureKey::PrioritySupport => "prioritySupport",
            FeatureKey::ExportReports => "exportReports",
            FeatureKey::MaxMealPlansPerMonth => "maxMealPlansPerMonth",
            FeatureKey::MaxWorkoutPlansPerMonth => "maxWorkoutPlansPerMonth",
            FeatureKey::MaxCoachMessagesPerMonth => "maxCoachMessagesPerMonth",
            FeatureKey::MaxProgressPhotosPerMonth => "maxProgressPhotosPerMonth",
        }
    }

    /// Returns the registry annotation for this key.
    pub fn descriptor(&self) -> FeatureDescriptor {
        use FeatureKind::{Flag, Limit};

        let (kind, min_rank, description) = match self {
            FeatureKey::AdvancedAnalytics => (Flag, 2, "Trend analytics across logged health metrics"),
            FeatureKey::CoachMessaging => (Flag, 1, "Direct messaging with an assigned coach"),
            FeatureKey::CustomMealPlans => (Flag, 1, "Meal plans tailored to dietary preferences"),
            FeatureKey::WearableSync => (Flag, 2, "Automatic import from connected wearables"),
            FeatureKey::ProgressPhotos => (Flag, 1, "Upload and compare progress photos"),
            FeatureKey::PrioritySupport => (Flag, 3, "Support requests answered within one business day"),
            FeatureKey::ExportReports => (Flag, 2, "PDF and CSV export of progress reports"),
            FeatureKey::MaxMealPlansPerMonth => (Limit, 0, "Meal plans generated per calendar month"),
            FeatureKey::MaxWorkoutPlansPerMonth => (Limit, 0, "Workout plans generated per calendar month"),
            FeatureKey::MaxCoachMessagesPerMonth => (Limit, 1, "Coach messages sent per calendar month"),
            FeatureKey::MaxProgressPhotosPerMonth => (Limit, 1, "Progress photos uploaded per calendar month"),
        };

        FeatureDescriptor {
            key: *self,
            kind,
            min_rank,
            description,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        self.descriptor().kind
    }

    pub fn min_rank(&self) -> u32 {
        self.descriptor().min_rank
    }

    /// Fails unless the key is of the expected kind.
    pub fn expect_kind(&self, expected: FeatureKind) -> Result<(), ValidationError> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(ValidationError::kind_mismatch(self.as_str(), expected.value_type()))
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ValidationError::unknown_feature(s))
    }
}

/// Iterates the full registry in declaration order.
pub fn registry() -> impl Iterator<Item = FeatureDescriptor> {
    FeatureKey::ALL.into_iter().map(|key| key.descriptor())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde_names() {
        for key in FeatureKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }

    #[test]
    fn parses_every_registered_key() {
        for key in FeatureKey::ALL {
            assert_eq!(key.as_str().parse::<FeatureKey>().unwrap(), key);
        }
    }

    #[test]
    fn unknown_key_is_validation_error() {
        let err = "teleportation".parse::<FeatureKey>().unwrap_err();
        assert_eq!(err, ValidationError::unknown_feature("teleportation"));
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("AdvancedAnalytics".parse::<FeatureKey>().is_err());
    }

    #[test]
    fn limits_are_named_max() {
        for descriptor in registry() {
            assert_eq!(
                descriptor.kind == FeatureKind::Limit,
                descriptor.key.as_str().starts_with("max"),
                "{}",
                descriptor.key
            );
        }
    }

    #[test]
    fn advanced_analytics_requires_rank_two() {
        assert_eq!(FeatureKey::AdvancedAnalytics.min_rank(), 2);
        assert_eq!(FeatureKey::AdvancedAnalytics.kind(), FeatureKind::Flag);
    }

    #[test]
    fn expect_kind_rejects_mismatch() {
        assert!(FeatureKey::MaxMealPlansPerMonth.expect_kind(FeatureKind::Limit).is_ok());
        let err = FeatureKey::MaxMealPlansPerMonth
            .expect_kind(FeatureKind::Flag)
            .unwrap_err();
        assert!(err.to_string().contains("boolean"));
    }
}
