//! Audit trail of override mutations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{FeatureKey, OverrideValue};
use crate::domain::foundation::{AdminId, AuditEntryId, Timestamp, UserId};

/// Before and after value of one key. `None` means no override was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange {
    pub before: Option<OverrideValue>,
    pub after: Option<OverrideValue>,
}

/// Per-key changes produced by one mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditDiff(BTreeMap<FeatureKey, ValueChange>);

impl AuditDiff {
    /// Diff of every key whose value differs between two snapshots.
    pub fn between(
        before: &BTreeMap<FeatureKey, OverrideValue>,
        after: &BTreeMap<FeatureKey, OverrideValue>,
    ) -> Self {
        let mut changes = BTreeMap::new();
        for key in before.keys().chain(after.keys()) {
            let change = ValueChange {
                before: before.get(key).copied(),
                after: after.get(key).copied(),
            };
            if change.before != change.after {
                changes.insert(*key, change);
            }
        }
        Self(changes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: FeatureKey) -> Option<&ValueChange> {
        self.0.get(&key)
    }
}

/// Kind of mutation an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Set,
    Reset,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Set => "set",
            AuditAction::Reset => "reset",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub acting_admin_id: AdminId,
    pub target_user_id: UserId,
    pub action: AuditAction,
    pub recorded_at: Timestamp,
    pub diff: AuditDiff,
}

impl AuditLogEntry {
    pub fn new(
        acting_admin_id: AdminId,
        target_user_id: UserId,
        action: AuditAction,
        diff: AuditDiff,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            acting_admin_id,
            target_user_id,
            action,
            recorded_at: Timestamp::now(),
            diff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::Limit;

    fn snapshot(entries: &[(FeatureKey, OverrideValue)]) -> BTreeMap<FeatureKey, OverrideValue> {
        entries.iter().copied().collect()
    }

    #[test]
    fn identical_snapshots_produce_empty_diff() {
        let state = snapshot(&[(FeatureKey::WearableSync, OverrideValue::Flag(true))]);
        assert!(AuditDiff::between(&state, &state).is_empty());
    }

    #[test]
    fn diff_captures_added_changed_and_removed_keys() {
        let before = snapshot(&[
            (FeatureKey::WearableSync, OverrideValue::Flag(true)),
            (FeatureKey::MaxMealPlansPerMonth, OverrideValue::Limit(Limit::Capped(5))),
            (FeatureKey::ExportReports, OverrideValue::Flag(false)),
        ]);
        let after = snapshot(&[
            (FeatureKey::MaxMealPlansPerMonth, OverrideValue::Limit(Limit::Unlimited)),
            (FeatureKey::ExportReports, OverrideValue::Flag(false)),
            (FeatureKey::CoachMessaging, OverrideValue::Flag(true)),
        ]);

        let diff = AuditDiff::between(&before, &after);

        assert_eq!(diff.len(), 3);
        assert_eq!(
            diff.get(FeatureKey::WearableSync),
            Some(&ValueChange { before: Some(OverrideValue::Flag(true)), after: None })
        );
        assert_eq!(
            diff.get(FeatureKey::CoachMessaging),
            Some(&ValueChange { before: None, after: Some(OverrideValue::Flag(true)) })
        );
        assert!(diff.get(FeatureKey::ExportReports).is_none());
    }

    #[test]
    fn diff_serializes_as_feature_keyed_map() {
        let diff = AuditDiff::between(
            &BTreeMap::new(),
            &snapshot(&[(FeatureKey::MaxMealPlansPerMonth, OverrideValue::Limit(Limit::Capped(5)))]),
        );

        let json = serde_json::to_value(&diff).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "maxMealPlansPerMonth": { "before": null, "after": 5 } })
        );

        let back: AuditDiff = serde_json::from_value(json).unwrap();
        assert_eq!(back, diff);
    }
}
