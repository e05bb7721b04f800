//! PostgreSQL implementation of AuditLog.
//!
//! `override_audit_log` is insert-only; the diff is stored as JSONB in the
//! same shape the admin API returns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::errors::{corrupt_row, database_error};
use crate::domain::entitlement::{AuditAction, AuditDiff, AuditLogEntry};
use crate::domain::foundation::{AdminId, AuditEntryId, DomainError, Timestamp, UserId};
use crate::ports::AuditLog;

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    acting_admin_id: String,
    target_user_id: String,
    action: String,
    recorded_at: DateTime<Utc>,
    diff: Json<AuditDiff>,
}

fn parse_action(s: &str) -> Result<AuditAction, DomainError> {
    match s {
        "set" => Ok(AuditAction::Set),
        "reset" => Ok(AuditAction::Reset),
        other => Err(corrupt_row("action", other)),
    }
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditLogEntry {
            id: AuditEntryId::from_uuid(row.id),
            acting_admin_id: AdminId::new(row.acting_admin_id).map_err(|e| corrupt_row("acting_admin_id", e))?,
            target_user_id: UserId::new(row.target_user_id).map_err(|e| corrupt_row("target_user_id", e))?,
            action: parse_action(&row.action)?,
            recorded_at: Timestamp::from_datetime(row.recorded_at),
            diff: row.diff.0,
        })
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO override_audit_log (id, acting_admin_id, target_user_id, action, recorded_at, diff)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.acting_admin_id.as_str())
        .bind(entry.target_user_id.as_str())
        .bind(entry.action.as_str())
        .bind(entry.recorded_at.as_datetime())
        .bind(Json(&entry.diff))
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("Failed to append audit entry", e))?;

        Ok(())
    }

    async fn entries_for(&self, user_id: &UserId) -> Result<Vec<AuditLogEntry>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, acting_admin_id, target_user_id, action, recorded_at, diff
            FROM override_audit_log
            WHERE target_user_id = $1
            ORDER BY recorded_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("Failed to list audit entries", e))?;

        rows.into_iter().map(AuditLogEntry::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_entry() {
        let id = Uuid::new_v4();
        let row = AuditRow {
            id,
            acting_admin_id: "admin-1".to_string(),
            target_user_id: "user-1".to_string(),
            action: "reset".to_string(),
            recorded_at: Utc::now(),
            diff: Json(AuditDiff::default()),
        };

        let entry = AuditLogEntry::try_from(row).unwrap();
        assert_eq!(entry.id, AuditEntryId::from_uuid(id));
        assert_eq!(entry.action, AuditAction::Reset);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(parse_action("delete").is_err());
    }
}
