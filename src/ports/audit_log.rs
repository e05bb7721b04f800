//! AuditLog port - Append-only storage of override audit entries.

use async_trait::async_trait;

use crate::domain::entitlement::AuditLogEntry;
use crate::domain::foundation::{DomainError, UserId};

/// Port for the audit trail. Entries are never updated or deleted.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends one entry. Appending an id that already exists is a no-op.
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError>;

    /// Entries targeting a user, oldest first.
    async fn entries_for(&self, user_id: &UserId) -> Result<Vec<AuditLogEntry>, DomainError>;
}
