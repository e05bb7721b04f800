//! ListAuditEntriesHandler - Query handler for a user's override history.

use std::sync::Arc;

use crate::application::services::AuditLogger;
use crate::domain::entitlement::{AuditLogEntry, EntitlementError};
use crate::domain::foundation::UserId;

#[derive(Debug, Clone)]
pub struct ListAuditEntriesQuery {
    pub user_id: UserId,
}

pub struct ListAuditEntriesHandler {
    audit: Arc<AuditLogger>,
}

impl ListAuditEntriesHandler {
    pub fn new(audit: Arc<AuditLogger>) -> Self {
        Self { audit }
    }

    /// Entries targeting the user, oldest first.
    pub async fn handle(&self, query: ListAuditEntriesQuery) -> Result<Vec<AuditLogEntry>, EntitlementError> {
        Ok(self.audit.entries_for(&query.user_id).await?)
    }
}
