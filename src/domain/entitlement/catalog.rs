//! Tier catalog.
//!
//! An immutable, rank-ordered set of tiers. The catalog is constructed once
//! (from configuration or [`TierCatalog::standard`]) and injected wherever
//! decisions are made; there is no process-wide instance.

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::{registry, FeatureKey, FeatureKind, Limit, Tier, TierId};

/// Errors raised while constructing a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("tier catalog must contain at least one tier")]
    Empty,

    #[error("tiers '{first}' and '{second}' share rank {rank}")]
    DuplicateRank {
        rank: u32,
        first: TierId,
        second: TierId,
    },

    #[error("tier id '{0}' appears more than once")]
    DuplicateTierId(TierId),

    #[error("tier '{tier}' lists '{feature}' under the wrong defaults map (expected {expected})")]
    KindMismatch {
        tier: TierId,
        feature: FeatureKey,
        expected: &'static str,
    },

    #[error("failed to parse tier catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read tier catalog from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A breach of the "higher rank is a superset" authoring convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogViolation {
    /// A tier below the feature's registry minimum rank grants it.
    GrantedBelowMinimumRank {
        tier: TierId,
        feature: FeatureKey,
        min_rank: u32,
    },
    /// A higher tier offers less than the tier directly below it.
    Regression {
        lower: TierId,
        higher: TierId,
        feature: FeatureKey,
    },
}

impl fmt::Display for CatalogViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogViolation::GrantedBelowMinimumRank {
                tier,
                feature,
                min_rank,
            } => write!(
                f,
                "tier '{}' grants '{}' which requires rank {}",
                tier, feature, min_rank
            ),
            CatalogViolation::Regression {
                lower,
                higher,
                feature,
            } => write!(
                f,
                "tier '{}' offers less '{}' than lower tier '{}'",
                higher, feature, lower
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    tiers: Vec<Tier>,
}

/// Rank-ordered, read-only tier catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierCatalog {
    /// Sorted by ascending rank; never empty.
    tiers: Vec<Tier>,
}

impl TierCatalog {
    /// Builds a catalog, enforcing unique ids and ranks.
    pub fn new(mut tiers: Vec<Tier>) -> Result<Self, CatalogError> {
        if tiers.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut ids = HashSet::new();
        for tier in &tiers {
            if !ids.insert(tier.id.clone()) {
                return Err(CatalogError::DuplicateTierId(tier.id.clone()));
            }
            Self::check_kinds(tier)?;
        }

        tiers.sort_by_key(|tier| tier.rank);
        for pair in tiers.windows(2) {
            if pair[0].rank == pair[1].rank {
                return Err(CatalogError::DuplicateRank {
                    rank: pair[0].rank,
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                });
            }
        }

        Ok(Self { tiers })
    }

    /// Parses a YAML document of the form `tiers: [ {id, name, rank, ...} ]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_yaml::from_str(yaml)?;
        Self::new(document.tiers)
    }

    /// Reads and parses a YAML catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The default four-tier catalog: free, basic, premium, elite.
    pub fn standard() -> Self {
        use FeatureKey::*;

        let id = TierId::from_static;

        let free = Tier::new(id("free"), "Free", 0)
            .with_limit(MaxMealPlansPerMonth, Limit::Capped(2))
            .with_limit(MaxWorkoutPlansPerMonth, Limit::Capped(2))
            .with_limit(MaxCoachMessagesPerMonth, Limit::DISABLED)
            .with_limit(MaxProgressPhotosPerMonth, Limit::DISABLED);

        let basic = Tier::new(id("basic"), "Basic", 1)
            .with_feature(CoachMessaging, true)
            .with_feature(CustomMealPlans, true)
            .with_feature(ProgressPhotos, true)
            .with_limit(MaxMealPlansPerMonth, Limit::Capped(10))
            .with_limit(MaxWorkoutPlansPerMonth, Limit::Capped(10))
            .with_limit(MaxCoachMessagesPerMonth, Limit::Capped(20))
            .with_limit(MaxProgressPhotosPerMonth, Limit::Capped(10));

        let premium = Tier::new(id("premium"), "Premium", 2)
            .with_feature(CoachMessaging, true)
            .with_feature(CustomMealPlans, true)
            .with_feature(ProgressPhotos, true)
            .with_feature(AdvancedAnalytics, true)
            .with_feature(WearableSync, true)
            .with_feature(ExportReports, true)
            .with_limit(MaxMealPlansPerMonth, Limit::Capped(30))
            .with_limit(MaxWorkoutPlansPerMonth, Limit::Capped(30))
            .with_limit(MaxCoachMessagesPerMonth, Limit::Capped(100))
            .with_limit(MaxProgressPhotosPerMonth, Limit::Capped(50));

        let elite = Tier::new(id("elite"), "Elite", 3)
            .with_feature(CoachMessaging, true)
            .with_feature(CustomMealPlans, true)
            .with_feature(ProgressPhotos, true)
            .with_feature(AdvancedAnalytics, true)
            .with_feature(WearableSync, true)
            .with_feature(ExportReports, true)
            .with_feature(PrioritySupport, true)
            .with_limit(MaxMealPlansPerMonth, Limit::Unlimited)
            .with_limit(MaxWorkoutPlansPerMonth, Limit::Unlimited)
            .with_limit(MaxCoachMessagesPerMonth, Limit::Unlimited)
            .with_limit(MaxProgressPhotosPerMonth, Limit::Unlimited);

        Self {
            tiers: vec![free, basic, premium, elite],
        }
    }

    /// Looks up a tier by id.
    pub fn get_tier(&self, id: &TierId) -> Option<&Tier> {
        self.tiers.iter().find(|tier| &tier.id == id)
    }

    /// All tiers in ascending rank order.
    pub fn list_tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Rank of the given tier, if it exists.
    pub fn rank_of(&self, id: &TierId) -> Option<u32> {
        self.get_tier(id).map(|tier| tier.rank)
    }

    /// The lowest-ranked tier, used as the fallback for lapsed subscriptions.
    pub fn lowest(&self) -> &Tier {
        &self.tiers[0]
    }

    /// Lists breaches of the superset convention across ranks.
    ///
    /// An empty result means every feature available at a tier is also
    /// available, with at least the same quota, at every higher tier.
    pub fn monotonicity_violations(&self) -> Vec<CatalogViolation> {
        let mut violations = Vec::new();

        for tier in &self.tiers {
            for descriptor in registry() {
                if tier.rank >= descriptor.min_rank {
                    continue;
                }
                let granted = match descriptor.kind {
                    FeatureKind::Flag => tier.flag_default(descriptor.key),
                    FeatureKind::Limit => !tier.limit_default(descriptor.key).is_disabled(),
                };
                if granted {
                    violations.push(CatalogViolation::GrantedBelowMinimumRank {
                        tier: tier.id.clone(),
                        feature: descriptor.key,
                        min_rank: descriptor.min_rank,
                    });
                }
            }
        }

        for pair in self.tiers.windows(2) {
            let (lower, higher) = (&pair[0], &pair[1]);
            for descriptor in registry() {
                let regressed = match descriptor.kind {
                    FeatureKind::Flag => {
                        lower.flag_default(descriptor.key) && !higher.flag_default(descriptor.key)
                    }
                    FeatureKind::Limit => {
                        higher.limit_default(descriptor.key) < lower.limit_default(descriptor.key)
                    }
                };
                if regressed {
                    violations.push(CatalogViolation::Regression {
                        lower: lower.id.clone(),
                        higher: higher.id.clone(),
                        feature: descriptor.key,
                    });
                }
            }
        }

        violations
    }

    fn check_kinds(tier: &Tier) -> Result<(), CatalogError> {
        let mismatch = |feature: FeatureKey, expected: FeatureKind| CatalogError::KindMismatch {
            tier: tier.id.clone(),
            feature,
            expected: expected.value_type(),
        };

        for key in tier.feature_defaults.keys() {
            if key.kind() != FeatureKind::Flag {
                return Err(mismatch(*key, key.kind()));
            }
        }
        for key in tier.limit_defaults.keys() {
            if key.kind() != FeatureKind::Limit {
                return Err(mismatch(*key, key.kind()));
            }
        }
        Ok(())
    }
}
