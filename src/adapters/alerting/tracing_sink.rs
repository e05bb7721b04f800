//! Alert sink that reports through `tracing` at error level.
//!
//! Log shippers pick these events up by their `alert` field.

use crate::domain::entitlement::AuditLogEntry;
use crate::domain::foundation::DomainError;
use crate::ports::AuditAlertSink;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditAlertSink;

impl TracingAuditAlertSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditAlertSink for TracingAuditAlertSink {
    fn audit_write_failed(&self, entry: &AuditLogEntry, error: &DomainError, pending: usize) {
        tracing::error!(
            alert = "audit_write_failed",
            audit_id = %entry.id,
            admin_id = %entry.acting_admin_id,
            user_id = %entry.target_user_id,
            action = %entry.action,
            error_code = %error.code,
            error = %error.message,
            pending,
            "override audit entry could not be written; queued for retry"
        );
    }
}
