//! Application services shared by the entitlement handlers.

mod audit_logger;
mod retry;
mod usage_counter;

pub use audit_logger::{AuditLogger, DEFAULT_PENDING_CAPACITY};
pub use retry::{with_retry, RetryConfig, RetryFailure};
pub use usage_counter::UsageCounterService;
