//! OverrideStore port - Persistence for per-user administrative overrides.
//!
//! Flag and limit overrides are stored separately; implementations keep one
//! row per `(user, feature)` in each store.

use async_trait::async_trait;

use crate::domain::entitlement::{FeatureOverrides, OverridePatch};
use crate::domain::foundation::{AdminId, DomainError, Timestamp, UserId};

/// State of a user's overrides around a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideMerge {
    pub before: FeatureOverrides,
    pub after: FeatureOverrides,
}

/// Port for reading and mutating override rows.
///
/// Concurrent writes for the same user are last-write-wins.
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// All overrides held for a user. Empty when none exist.
    async fn get(&self, user_id: &UserId) -> Result<FeatureOverrides, DomainError>;

    /// Shallow-merges an already validated patch.
    ///
    /// Keys whose value does not change keep their original provenance.
    async fn merge(
        &self,
        user_id: &UserId,
        patch: &OverridePatch,
        set_by: &AdminId,
        set_at: Timestamp,
    ) -> Result<OverrideMerge, DomainError>;

    /// Deletes every override for a user and returns what was removed.
    async fn clear(&self, user_id: &UserId) -> Result<FeatureOverrides, DomainError>;
}
