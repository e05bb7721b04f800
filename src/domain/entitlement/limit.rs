//! Numeric quota value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// A numeric quota.
///
/// The wire form is the integer sentinel encoding: `-1` means unlimited,
/// any non-negative integer is a cap. `Capped(0)` means explicitly disabled.
///
/// Ordering: every cap is below `Unlimited`, caps compare by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Limit {
    Capped(u32),
    Unlimited,
}

impl Limit {
    /// Wire sentinel for [`Limit::Unlimited`].
    pub const UNLIMITED_SENTINEL: i64 = -1;

    /// Explicitly disabled quota.
    pub const DISABLED: Limit = Limit::Capped(0);

    /// Decodes the integer sentinel form.
    pub fn from_sentinel(value: i64) -> Result<Self, ValidationError> {
        if value == Self::UNLIMITED_SENTINEL {
            return Ok(Limit::Unlimited);
        }
        u32::try_from(value)
            .map(Limit::Capped)
            .map_err(|_| ValidationError::out_of_range("limit", -1, i64::from(u32::MAX), value))
    }

    /// Encodes into the integer sentinel form.
    pub fn as_sentinel(&self) -> i64 {
        match self {
            Limit::Unlimited => Self::UNLIMITED_SENTINEL,
            Limit::Capped(n) => i64::from(*n),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    pub fn is_disabled(&self) -> bool {
        *self == Self::DISABLED
    }

    /// Returns true if `used` is still below this quota.
    pub fn permits(&self, used: u64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Capped(cap) => used < u64::from(*cap),
        }
    }

    /// Units left before the quota is reached. `None` when unlimited.
    pub fn remaining(&self, used: u64) -> Option<u64> {
        match self {
            Limit::Unlimited => None,
            Limit::Capped(cap) => Some(u64::from(*cap).saturating_sub(used)),
        }
    }
}

impl TryFrom<i64> for Limit {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_sentinel(value)
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        limit.as_sentinel()
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unlimited => f.write_str("unlimited"),
            Limit::Capped(n) => write!(f, "{}", n),
        }
    }
}
