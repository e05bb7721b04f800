//! PostgreSQL implementation of UsageCounterStore.
//!
//! Increments are a single `INSERT .. ON CONFLICT DO UPDATE .. RETURNING`
//! statement, so the row lock taken by the upsert serialises concurrent
//! increments for the same key.

use async_trait::async_trait;
use sqlx::PgPool;

use super::errors::usage_error;
use crate::ports::{UsageCounterStore, UsageKey, UsageStoreError};

pub struct PostgresUsageCounterStore {
    pool: PgPool,
}

impl PostgresUsageCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageCounterStore for PostgresUsageCounterStore {
    async fn get(&self, key: &UsageKey) -> Result<u64, UsageStoreError> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT count FROM usage_counters
            WHERE user_id = $1 AND feature_key = $2 AND period_key = $3
            "#,
        )
        .bind(key.user_id.as_str())
        .bind(key.feature.as_str())
        .bind(key.period.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(usage_error)?;

        match count {
            Some(count) => u64::try_from(count)
                .map_err(|_| UsageStoreError::Fatal(format!("negative count {} for {}", count, key))),
            None => Ok(0),
        }
    }

    async fn increment(&self, key: &UsageKey, amount: u64) -> Result<u64, UsageStoreError> {
        let amount = i64::try_from(amount).map_err(|_| UsageStoreError::Overflow)?;

        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO usage_counters (user_id, feature_key, period_key, count, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, feature_key, period_key)
            DO UPDATE SET count = usage_counters.count + EXCLUDED.count, updated_at = NOW()
            RETURNING count
            "#,
        )
        .bind(key.user_id.as_str())
        .bind(key.feature.as_str())
        .bind(key.period.to_string())
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(usage_error)?;

        u64::try_from(count)
            .map_err(|_| UsageStoreError::Fatal(format!("negative count {} for {}", count, key)))
    }
}
