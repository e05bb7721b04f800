//! AuditLogger - Best-effort, monitored audit trail for override mutations.
//!
//! Recording never fails the caller. An entry that cannot be written is
//! kept in an in-process queue and an alert is raised through the
//! [`AuditAlertSink`]. Recording makes a single write attempt and never
//! waits on the queue; [`AuditLogger::retry_pending`] drains it on demand.
//! Readers order entries by `recorded_at`, so late writes keep their place.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::entitlement::{AuditAction, AuditDiff, AuditLogEntry};
use crate::domain::foundation::{AdminId, DomainError, UserId};
use crate::ports::{AuditAlertSink, AuditLog};

/// Default bound on queued entries awaiting retry.
pub const DEFAULT_PENDING_CAPACITY: usize = 10_000;

pub struct AuditLogger {
    log: Arc<dyn AuditLog>,
    alerts: Arc<dyn AuditAlertSink>,
    pending: Mutex<VecDeque<AuditLogEntry>>,
    capacity: usize,
}

impl AuditLogger {
    pub fn new(log: Arc<dyn AuditLog>, alerts: Arc<dyn AuditAlertSink>) -> Self {
        Self::with_capacity(log, alerts, DEFAULT_PENDING_CAPACITY)
    }

    pub fn with_capacity(
        log: Arc<dyn AuditLog>,
        alerts: Arc<dyn AuditAlertSink>,
        capacity: usize,
    ) -> Self {
        Self {
            log,
            alerts,
            pending: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Builds and writes one entry. On write failure the entry is queued.
    pub async fn record(
        &self,
        acting_admin_id: &AdminId,
        target_user_id: &UserId,
        action: AuditAction,
        diff: AuditDiff,
    ) -> AuditLogEntry {
        let entry = AuditLogEntry::new(
            acting_admin_id.clone(),
            target_user_id.clone(),
            action,
            diff,
        );

        match self.log.append(&entry).await {
            Ok(()) => {
                tracing::info!(
                    audit_id = %entry.id,
                    admin_id = %entry.acting_admin_id,
                    user_id = %entry.target_user_id,
                    action = %entry.action,
                    changes = entry.diff.len(),
                    "override audit entry recorded"
                );
            }
            Err(error) => {
                let pending = self.enqueue(entry.clone()).await;
                self.alerts.audit_write_failed(&entry, &error, pending);
            }
        }

        entry
    }

    /// Retries every queued entry once, in order.
    ///
    /// Returns the number written. Entries that fail again stay queued ahead
    /// of anything recorded meanwhile. The queue lock is not held while
    /// writing.
    pub async fn retry_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.is_empty() {
            return 0;
        }

        let mut written = 0;
        let mut still_failing = VecDeque::new();
        for entry in batch {
            match self.log.append(&entry).await {
                Ok(()) => written += 1,
                Err(error) => {
                    tracing::warn!(audit_id = %entry.id, error = %error, "audit retry failed");
                    still_failing.push_back(entry);
                }
            }
        }

        let mut pending = self.pending.lock().await;
        still_failing.extend(pending.drain(..));
        while still_failing.len() > self.capacity {
            if let Some(dropped) = still_failing.pop_front() {
                tracing::error!(
                    audit_id = %dropped.id,
                    capacity = self.capacity,
                    "audit retry queue full, dropping oldest entry"
                );
            }
        }
        *pending = still_failing;

        if written > 0 {
            tracing::info!(written, remaining = pending.len(), "flushed pending audit entries");
        }
        written
    }

    /// Number of entries waiting to be written.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Entries targeting a user, oldest first.
    pub async fn entries_for(&self, user_id: &UserId) -> Result<Vec<AuditLogEntry>, DomainError> {
        self.log.entries_for(user_id).await
    }

    async fn enqueue(&self, entry: AuditLogEntry) -> usize {
        let mut pending = self.pending.lock().await;
        if pending.len() >= self.capacity {
            if let Some(dropped) = pending.pop_front() {
                tracing::error!(
                    audit_id = %dropped.id,
                    capacity = self.capacity,
                    "audit retry queue full, dropping oldest entry"
                );
            }
        }
        pending.push_back(entry);
        pending.len()
    }
}
