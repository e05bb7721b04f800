//! PostgreSQL implementation of SubscriberReader.
//!
//! Reads the `subscriptions` table maintained by the account subsystem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::errors::{corrupt_row, database_error};
use crate::domain::entitlement::{Subscriber, SubscriptionStatus, TierId};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::SubscriberReader;

pub struct PostgresSubscriberReader {
    pool: PgPool,
}

impl PostgresSubscriberReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    tier_id: String,
    status: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
}

impl SubscriptionRow {
    fn into_subscriber(self, user_id: UserId) -> Result<Subscriber, DomainError> {
        Ok(Subscriber {
            user_id,
            tier_id: TierId::new(self.tier_id).map_err(|e| corrupt_row("tier_id", e))?,
            status: self
                .status
                .parse::<SubscriptionStatus>()
                .map_err(|e| corrupt_row("status", e))?,
            period_start: Timestamp::from_datetime(self.period_start),
            period_end: Timestamp::from_datetime(self.period_end),
        })
    }
}

#[async_trait]
impl SubscriberReader for PostgresSubscriberReader {
    async fn find_subscriber(&self, user_id: &UserId) -> Result<Option<Subscriber>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT tier_id, status, period_start, period_end
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("Failed to load subscription", e))?;

        row.map(|row| row.into_subscriber(user_id.clone())).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let row = SubscriptionRow {
            tier_id: "basic".to_string(),
            status: "paused".to_string(),
            period_start: Utc::now(),
            period_end: Utc::now(),
        };
        assert!(row.into_subscriber(UserId::new("user-1").unwrap()).is_err());
    }
}
