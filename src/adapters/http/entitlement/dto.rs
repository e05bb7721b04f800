//! HTTP DTOs for entitlement endpoints.
//!
//! Limits cross the wire as integers: `-1` is unlimited, `0` is disabled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::handlers::entitlement::{RecordUsageResult, SetOverridesResult};
use crate::domain::entitlement::{
    AuditLogEntry, Decision, DecisionSource, FeatureDescriptor, FeatureKey, FeatureOverrides,
    Limit, OverrideValue, Tier,
};
use crate::domain::foundation::{AuditEntryId, PeriodKey};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/usage/:user/:feature`. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordUsageRequest {
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub period: Option<PeriodKey>,
}

/// Query string for the quota route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaParams {
    #[serde(default)]
    pub period: Option<PeriodKey>,
}

/// Body of `POST .../overrides/reset`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmResetRequest {
    pub token: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResponse {
    pub feature: FeatureKey,
    pub allowed: bool,
    pub limit: Limit,
    pub source: DecisionSource,
}

impl DecisionResponse {
    pub fn new(feature: FeatureKey, decision: Decision) -> Self {
        Self {
            feature,
            allowed: decision.allowed,
            limit: decision.limit,
            source: decision.source,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    pub has_access: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitResponse {
    pub limit: Limit,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordUsageResponse {
    pub period: PeriodKey,
    pub count: u64,
}

impl From<RecordUsageResult> for RecordUsageResponse {
    fn from(result: RecordUsageResult) -> Self {
        Self {
            period: result.period,
            count: result.count,
        }
    }
}

/// Current overrides: the flattened values plus who set each one.
#[derive(Debug, Clone, Serialize)]
pub struct OverridesResponse {
    pub overrides: BTreeMap<FeatureKey, OverrideValue>,
    pub details: FeatureOverrides,
}

impl From<FeatureOverrides> for OverridesResponse {
    fn from(details: FeatureOverrides) -> Self {
        Self {
            overrides: details.values(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SetOverridesResponse {
    pub overrides: BTreeMap<FeatureKey, OverrideValue>,
    pub audit_entry_id: AuditEntryId,
    pub changed: usize,
}

impl From<SetOverridesResult> for SetOverridesResponse {
    fn from(result: SetOverridesResult) -> Self {
        Self {
            overrides: result.overrides,
            audit_entry_id: result.audit_entry_id,
            changed: result.changed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntriesResponse {
    pub entries: Vec<AuditLogEntry>,
}

/// Outcome of draining the audit retry queue.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRetryResponse {
    pub written: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TiersResponse {
    pub tiers: Vec<Tier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeaturesResponse {
    pub registry_version: u32,
    pub features: Vec<FeatureDescriptor>,
}

/// Error body shared by every entitlement route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
