//! AuditAlertSink port - Operational alerting for lost audit writes.

use crate::domain::entitlement::AuditLogEntry;
use crate::domain::foundation::DomainError;

/// Receives an alert whenever an audit entry could not be written.
///
/// Called synchronously from the write path; implementations must not block.
pub trait AuditAlertSink: Send + Sync {
    fn audit_write_failed(&self, entry: &AuditLogEntry, error: &DomainError, pending: usize);
}
