//! In-memory override store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::entitlement::{FeatureOverrides, OverridePatch};
use crate::domain::foundation::{AdminId, DomainError, Timestamp, UserId};
use crate::ports::{OverrideMerge, OverrideStore};

/// Holds overrides per user behind a single lock. The write lock makes each
/// merge atomic; racing merges for the same user apply in lock order.
#[derive(Default)]
pub struct InMemoryOverrideStore {
    overrides: RwLock<HashMap<UserId, FeatureOverrides>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn get(&self, user_id: &UserId) -> Result<FeatureOverrides, DomainError> {
        Ok(self
            .overrides
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn merge(
        &self,
        user_id: &UserId,
        patch: &OverridePatch,
        set_by: &AdminId,
        set_at: Timestamp,
    ) -> Result<OverrideMerge, DomainError> {
        let mut overrides = self.overrides.write().await;
        let current = overrides.entry(user_id.clone()).or_default();
        let before = current.clone();
        current.merge(patch, set_by, set_at);
        let after = current.clone();

        if after.is_empty() {
            overrides.remove(user_id);
        }
        Ok(OverrideMerge { before, after })
    }

    async fn clear(&self, user_id: &UserId) -> Result<FeatureOverrides, DomainError> {
        Ok(self
            .overrides
            .write()
            .await
            .remove(user_id)
            .unwrap_or_default())
    }
}
