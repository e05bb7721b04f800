//! Application layer - Commands, Queries, Handlers and shared services.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Query handlers never mutate; command handlers write and audit.

pub mod handlers;
pub mod services;

pub use handlers::{
    // Queries
    CheckEntitlementHandler, CheckEntitlementQuery,
    CheckQuotaHandler, CheckQuotaQuery, QuotaStatus,
    GetOverridesHandler, GetOverridesQuery,
    ListAuditEntriesHandler, ListAuditEntriesQuery,
    // Commands
    ConfirmResetCommand, RequestResetCommand, ResetOverridesHandler, ResetOverridesResult,
    RecordUsageCommand, RecordUsageHandler, RecordUsageResult,
    SetOverridesCommand, SetOverridesHandler, SetOverridesResult,
};
pub use services::{AuditLogger, RetryConfig, UsageCounterService};
