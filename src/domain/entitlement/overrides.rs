//! Per-user administrative overrides.
//!
//! Boolean feature flags and numeric limits are held in two separately
//! typed maps. A key can only ever appear in the map matching its registry
//! kind.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FeatureKey, FeatureKind, Limit};
use crate::domain::foundation::{AdminId, Timestamp, ValidationError};

/// A single override value as it crosses the API boundary.
///
/// Serializes untagged: booleans for flags, sentinel integers for limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverrideValue {
    Flag(bool),
    Limit(Limit),
}

impl OverrideValue {
    pub fn kind(&self) -> FeatureKind {
        match self {
            OverrideValue::Flag(_) => FeatureKind::Flag,
            OverrideValue::Limit(_) => FeatureKind::Limit,
        }
    }

    /// Parses a raw JSON value for `key`, according to the key's registry kind.
    pub fn from_json(key: FeatureKey, raw: &serde_json::Value) -> Result<Self, ValidationError> {
        match key.kind() {
            FeatureKind::Flag => raw
                .as_bool()
                .map(OverrideValue::Flag)
                .ok_or_else(|| ValidationError::kind_mismatch(key.as_str(), "boolean")),
            FeatureKind::Limit => {
                let value = raw.as_i64().ok_or_else(|| {
                    ValidationError::kind_mismatch(key.as_str(), "integer limit")
                })?;
                Limit::from_sentinel(value).map(OverrideValue::Limit)
            }
        }
    }
}

/// A stored override together with who set it and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry<T> {
    pub value: T,
    pub set_by: AdminId,
    pub set_at: Timestamp,
}

/// All overrides currently held for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOverrides {
    #[serde(default)]
    flags: BTreeMap<FeatureKey, OverrideEntry<bool>>,
    #[serde(default)]
    limits: BTreeMap<FeatureKey, OverrideEntry<Limit>>,
}

impl FeatureOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.limits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len() + self.limits.len()
    }

    /// Boolean override for `key`, if one exists.
    pub fn flag(&self, key: FeatureKey) -> Option<bool> {
        self.flags.get(&key).map(|entry| entry.value)
    }

    /// Limit override for `key`, if one exists.
    pub fn limit(&self, key: FeatureKey) -> Option<Limit> {
        self.limits.get(&key).map(|entry| entry.value)
    }

    /// Override for `key` regardless of kind.
    pub fn value(&self, key: FeatureKey) -> Option<OverrideValue> {
        match key.kind() {
            FeatureKind::Flag => self.flag(key).map(OverrideValue::Flag),
            FeatureKind::Limit => self.limit(key).map(OverrideValue::Limit),
        }
    }

    /// Flattened `key -> value` view, as returned by `getOverrides`.
    pub fn values(&self) -> BTreeMap<FeatureKey, OverrideValue> {
        let flags = self
            .flags
            .iter()
            .map(|(key, entry)| (*key, OverrideValue::Flag(entry.value)));
        let limits = self
            .limits
            .iter()
            .map(|(key, entry)| (*key, OverrideValue::Limit(entry.value)));
        flags.chain(limits).collect()
    }

    /// Inserts a flag override, replacing any previous entry.
    pub fn insert_flag(&mut self, key: FeatureKey, entry: OverrideEntry<bool>) {
        self.flags.insert(key, entry);
    }

    /// Inserts a limit override, replacing any previous entry.
    pub fn insert_limit(&mut self, key: FeatureKey, entry: OverrideEntry<Limit>) {
        self.limits.insert(key, entry);
    }

    /// Shallow-merges a validated patch.
    ///
    /// Keys whose value is unchanged keep their original `set_by`/`set_at`.
    pub fn merge(&mut self, patch: &OverridePatch, set_by: &AdminId, set_at: Timestamp) {
        for (key, value) in patch.iter() {
            if self.value(key) == Some(value) {
                continue;
            }
            match value {
                OverrideValue::Flag(enabled) => self.insert_flag(
                    key,
                    OverrideEntry {
                        value: enabled,
                        set_by: set_by.clone(),
                        set_at,
                    },
                ),
                OverrideValue::Limit(limit) => self.insert_limit(
                    key,
                    OverrideEntry {
                        value: limit,
                        set_by: set_by.clone(),
                        set_at,
                    },
                ),
            }
        }
    }
}

/// A validated batch of override changes.
///
/// Constructing a patch is the only way to feed `setOverrides`, so a batch
/// containing any unknown key or ill-typed value is rejected as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverridePatch {
    entries: BTreeMap<FeatureKey, OverrideValue>,
}

impl OverridePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates typed entries against the registry kinds.
    pub fn try_from_entries(
        entries: impl IntoIterator<Item = (FeatureKey, OverrideValue)>,
    ) -> Result<Self, ValidationError> {
        let mut patch = Self::new();
        for (key, value) in entries {
            key.expect_kind(value.kind())
                .map_err(|_| ValidationError::kind_mismatch(key.as_str(), key.kind().value_type()))?;
            patch.entries.insert(key, value);
        }
        Ok(patch)
    }

    /// Parses an untyped `{ featureKey: value }` JSON object.
    pub fn from_json_map(
        raw: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ValidationError> {
        let mut patch = Self::new();
        for (name, value) in raw {
            let key: FeatureKey = name.parse()?;
            let value = OverrideValue::from_json(key, value)?;
            patch.entries.insert(key, value);
        }
        Ok(patch)
    }

    pub fn with_flag(mut self, key: FeatureKey, enabled: bool) -> Result<Self, ValidationError> {
        key.expect_kind(FeatureKind::Flag)?;
        self.entries.insert(key, OverrideValue::Flag(enabled));
        Ok(self)
    }

    pub fn with_limit(mut self, key: FeatureKey, limit: Limit) -> Result<Self, ValidationError> {
        key.expect_kind(FeatureKind::Limit)?;
        self.entries.insert(key, OverrideValue::Limit(limit));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: FeatureKey) -> Option<OverrideValue> {
        self.entries.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureKey, OverrideValue)> + '_ {
        self.entries.iter().map(|(key, value)| (*key, *value))
    }
}
