//! Entitlement handlers.
//!
//! ## Queries
//! - Resolve a feature decision (`hasAccess`, `getLimit`)
//! - Quota state for a metered feature
//! - Current overrides for a user
//! - Override audit history for a user
//!
//! ## Commands
//! - Record feature usage
//! - Merge overrides
//! - Request and confirm an override reset

mod check_entitlement;
mod check_quota;
mod get_overrides;
mod list_audit_entries;
mod record_usage;
mod reset_overrides;
mod set_overrides;

// Commands
pub use record_usage::{RecordUsageCommand, RecordUsageHandler, RecordUsageResult};
pub use reset_overrides::{
    ConfirmResetCommand, RequestResetCommand, ResetOverridesHandler, ResetOverridesResult,
};
pub use set_overrides::{SetOverridesCommand, SetOverridesHandler, SetOverridesResult};

// Queries
pub use check_entitlement::{CheckEntitlementHandler, CheckEntitlementQuery};
pub use check_quota::{CheckQuotaHandler, CheckQuotaQuery, QuotaStatus};
pub use get_overrides::{GetOverridesHandler, GetOverridesQuery};
pub use list_audit_entries::{ListAuditEntriesHandler, ListAuditEntriesQuery};
