//! Resolved entitlement decision.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Limit;

/// Which precedence layer produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    Override,
    Tier,
    Default,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionSource::Override => "override",
            DecisionSource::Tier => "tier",
            DecisionSource::Default => "default",
        };
        f.write_str(s)
    }
}

/// Allow/deny plus the quota that applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub limit: Limit,
    pub source: DecisionSource,
}

impl Decision {
    /// The most restrictive decision.
    pub fn denied() -> Self {
        Self {
            allowed: false,
            limit: Limit::DISABLED,
            source: DecisionSource::Default,
        }
    }

    /// Decision for a boolean feature.
    pub fn for_flag(enabled: bool, source: DecisionSource) -> Self {
        Self {
            allowed: enabled,
            limit: if enabled { Limit::Unlimited } else { Limit::DISABLED },
            source,
        }
    }

    /// Decision for a numeric feature. A zero quota is a denial.
    pub fn for_limit(limit: Limit, source: DecisionSource) -> Self {
        Self {
            allowed: !limit.is_disabled(),
            limit,
            source,
        }
    }
}
