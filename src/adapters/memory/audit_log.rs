//! In-memory append-only audit log.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::domain::entitlement::AuditLogEntry;
use crate::domain::foundation::{AuditEntryId, DomainError, UserId};
use crate::ports::AuditLog;

#[derive(Default)]
struct Entries {
    ordered: Vec<AuditLogEntry>,
    ids: HashSet<AuditEntryId>,
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Entries>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in append order.
    pub async fn all(&self) -> Vec<AuditLogEntry> {
        self.entries.read().await.ordered.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        if entries.ids.insert(entry.id) {
            entries.ordered.push(entry.clone());
        }
        Ok(())
    }

    async fn entries_for(&self, user_id: &UserId) -> Result<Vec<AuditLogEntry>, DomainError> {
        let mut matching: Vec<AuditLogEntry> = self
            .entries
            .read()
            .await
            .ordered
            .iter()
            .filter(|entry| &entry.target_user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|entry| entry.recorded_at);
        Ok(matching)
    }
}
