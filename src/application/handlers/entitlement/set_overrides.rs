//! SetOverridesHandler - Command handler for merging administrative overrides.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::services::AuditLogger;
use crate::domain::entitlement::{
    AuditAction, AuditDiff, EntitlementError, FeatureKey, OverridePatch, OverrideValue,
};
use crate::domain::foundation::{AdminId, AuditEntryId, Timestamp, UserId, ValidationError};
use crate::ports::OverrideStore;

/// Command to shallow-merge overrides into a user's current set.
#[derive(Debug, Clone)]
pub struct SetOverridesCommand {
    pub user_id: UserId,
    pub acting_admin_id: AdminId,
    pub patch: OverridePatch,
}

impl SetOverridesCommand {
    pub fn new(user_id: UserId, acting_admin_id: AdminId, patch: OverridePatch) -> Self {
        Self {
            user_id,
            acting_admin_id,
            patch,
        }
    }

    /// Builds the command from an untyped `{ featureKey: value }` object.
    ///
    /// A single unknown key or ill-typed value rejects the whole batch.
    pub fn from_json(
        user_id: UserId,
        acting_admin_id: AdminId,
        changes: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ValidationError> {
        match OverridePatch::from_json_map(changes) {
            Ok(patch) => Ok(Self::new(user_id, acting_admin_id, patch)),
            Err(error) => {
                tracing::warn!(
                    user_id = %user_id,
                    admin_id = %acting_admin_id,
                    keys = changes.len(),
                    error = %error,
                    "override batch rejected"
                );
                Err(error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOverridesResult {
    /// Full override map after the merge.
    pub overrides: BTreeMap<FeatureKey, OverrideValue>,
    pub audit_entry_id: AuditEntryId,
    /// Number of keys whose value changed.
    pub changed: usize,
}

pub struct SetOverridesHandler {
    store: Arc<dyn OverrideStore>,
    audit: Arc<AuditLogger>,
}

impl SetOverridesHandler {
    pub fn new(store: Arc<dyn OverrideStore>, audit: Arc<AuditLogger>) -> Self {
        Self { store, audit }
    }

    /// Merges the patch and records one audit entry, even when nothing
    /// changed. The audit write never fails the merge.
    pub async fn handle(&self, cmd: SetOverridesCommand) -> Result<SetOverridesResult, EntitlementError> {
        let merge = self
            .store
            .merge(&cmd.user_id, &cmd.patch, &cmd.acting_admin_id, Timestamp::now())
            .await?;

        let after = merge.after.values();
        let diff = AuditDiff::between(&merge.before.values(), &after);
        let changed = diff.len();

        let entry = self
            .audit
            .record(&cmd.acting_admin_id, &cmd.user_id, AuditAction::Set, diff)
            .await;

        tracing::info!(
            user_id = %cmd.user_id,
            admin_id = %cmd.acting_admin_id,
            submitted = cmd.patch.len(),
            changed,
            "overrides updated"
        );

        Ok(SetOverridesResult {
            overrides: after,
            audit_entry_id: entry.id,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::alerting::TracingAuditAlertSink;
    use crate::adapters::memory::{InMemoryAuditLog, InMemoryOverrideStore};
    use crate::domain::entitlement::{Limit, ValueChange};
    use serde_json::json;

    struct Fixture {
        handler: SetOverridesHandler,
        store: Arc<InMemoryOverrideStore>,
        audit: Arc<AuditLogger>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryOverrideStore::new());
        let audit = Arc::new(AuditLogger::new(
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(TracingAuditAlertSink::new()),
        ));
        Fixture {
            handler: SetOverridesHandler::new(store.clone(), audit.clone()),
            store,
            audit,
        }
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn admin() -> AdminId {
        AdminId::new("admin-1").unwrap()
    }

    fn command(changes: serde_json::Value) -> Result<SetOverridesCommand, ValidationError> {
        SetOverridesCommand::from_json(user(), admin(), changes.as_object().unwrap())
    }

    #[tokio::test]
    async fn merge_returns_full_map_and_audits_changes() {
        let f = fixture();
        f.handler
            .handle(command(json!({ "advancedAnalytics": true })).unwrap())
            .await
            .unwrap();

        let result = f
            .handler
            .handle(command(json!({ "maxMealPlansPerMonth": 5 })).unwrap())
            .await
            .unwrap();

        assert_eq!(result.overrides.len(), 2);
        assert_eq!(result.changed, 1);

        let entries = f.audit.entries_for(&user()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1].diff.get(FeatureKey::MaxMealPlansPerMonth),
            Some(&ValueChange {
                before: None,
                after: Some(OverrideValue::Limit(Limit::Capped(5))),
            })
        );
    }

    #[tokio::test]
    async fn no_op_batch_is_audited_with_empty_diff() {
        let f = fixture();
        let cmd = command(json!({ "wearableSync": true })).unwrap();
        f.handler.handle(cmd.clone()).await.unwrap();

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result.changed, 0);
        let entries = f.audit.entries_for(&user()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].diff.is_empty());
        assert_eq!(result.audit_entry_id, entries[1].id);
    }

    #[tokio::test]
    async fn invalid_batch_changes_nothing() {
        let f = fixture();
        let rejected = command(json!({ "advancedAnalytics": true, "flyingCars": true }));
        assert!(rejected.is_err());

        assert!(f.store.get(&user()).await.unwrap().is_empty());
        assert!(f.audit.entries_for(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replacing_value_records_before_and_after() {
        let f = fixture();
        f.handler
            .handle(command(json!({ "maxCoachMessagesPerMonth": -1 })).unwrap())
            .await
            .unwrap();
        f.handler
            .handle(command(json!({ "maxCoachMessagesPerMonth": 0 })).unwrap())
            .await
            .unwrap();

        let entries = f.audit.entries_for(&user()).await.unwrap();
        assert_eq!(
            entries[1].diff.get(FeatureKey::MaxCoachMessagesPerMonth),
            Some(&ValueChange {
                before: Some(OverrideValue::Limit(Limit::Unlimited)),
                after: Some(OverrideValue::Limit(Limit::Capped(0))),
            })
        );
    }
}
