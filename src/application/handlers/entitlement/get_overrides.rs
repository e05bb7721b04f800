//! GetOverridesHandler - Query handler for a user's current overrides.

use std::sync::Arc;

use crate::domain::entitlement::{EntitlementError, FeatureOverrides};
use crate::domain::foundation::UserId;
use crate::ports::OverrideStore;

#[derive(Debug, Clone)]
pub struct GetOverridesQuery {
    pub user_id: UserId,
}

pub struct GetOverridesHandler {
    store: Arc<dyn OverrideStore>,
}

impl GetOverridesHandler {
    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self { store }
    }

    /// Returns every override held for the user. Empty when none exist.
    pub async fn handle(&self, query: GetOverridesQuery) -> Result<FeatureOverrides, EntitlementError> {
        Ok(self.store.get(&query.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOverrideStore;

    #[tokio::test]
    async fn returns_empty_for_user_without_overrides() {
        let handler = GetOverridesHandler::new(Arc::new(InMemoryOverrideStore::new()));
        let overrides = handler
            .handle(GetOverridesQuery {
                user_id: UserId::new("user-1").unwrap(),
            })
            .await
            .unwrap();
        assert!(overrides.values().is_empty());
    }
}
