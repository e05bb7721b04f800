//! PostgreSQL implementation of OverrideStore.
//!
//! Flags live in `feature_flag_overrides`, limits in
//! `feature_limit_overrides`; both are keyed by `(user_id, feature_key)`.
//! Rows whose key is no longer in the registry are ignored on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::errors::{corrupt_row, database_error};
use crate::domain::entitlement::{
    FeatureKey, FeatureKind, FeatureOverrides, Limit, OverrideEntry, OverridePatch, OverrideValue,
};
use crate::domain::foundation::{AdminId, DomainError, Timestamp, UserId};
use crate::ports::{OverrideMerge, OverrideStore};

pub struct PostgresOverrideStore {
    pool: PgPool,
}

impl PostgresOverrideStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FlagRow {
    feature_key: String,
    enabled: bool,
    set_by: String,
    set_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LimitRow {
    feature_key: String,
    limit_value: i64,
    set_by: String,
    set_at: DateTime<Utc>,
}

fn parse_key(raw: &str, kind: FeatureKind, user_id: &UserId) -> Option<FeatureKey> {
    match raw.parse::<FeatureKey>() {
        Ok(key) if key.kind() == kind => Some(key),
        Ok(_) => {
            tracing::warn!(user_id = %user_id, feature_key = raw, "ignoring override stored under the wrong kind");
            None
        }
        Err(_) => {
            tracing::warn!(user_id = %user_id, feature_key = raw, "ignoring override for unregistered feature");
            None
        }
    }
}

fn parse_admin(raw: String) -> Result<AdminId, DomainError> {
    AdminId::new(raw).map_err(|e| corrupt_row("set_by", e))
}

fn assemble(user_id: &UserId, flags: Vec<FlagRow>, limits: Vec<LimitRow>) -> Result<FeatureOverrides, DomainError> {
    let mut overrides = FeatureOverrides::new();

    for row in flags {
        let Some(key) = parse_key(&row.feature_key, FeatureKind::Flag, user_id) else {
            continue;
        };
        overrides.insert_flag(
            key,
            OverrideEntry {
                value: row.enabled,
                set_by: parse_admin(row.set_by)?,
                set_at: Timestamp::from_datetime(row.set_at),
            },
        );
    }

    for row in limits {
        let Some(key) = parse_key(&row.feature_key, FeatureKind::Limit, user_id) else {
            continue;
        };
        overrides.insert_limit(
            key,
            OverrideEntry {
                value: Limit::from_sentinel(row.limit_value).map_err(|e| corrupt_row("limit_value", e))?,
                set_by: parse_admin(row.set_by)?,
                set_at: Timestamp::from_datetime(row.set_at),
            },
        );
    }

    Ok(overrides)
}

async fn load(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &UserId,
    lock: bool,
) -> Result<FeatureOverrides, DomainError> {
    let suffix = if lock { " FOR UPDATE" } else { "" };

    let flags: Vec<FlagRow> = sqlx::query_as(&format!(
        "SELECT feature_key, enabled, set_by, set_at FROM feature_flag_overrides WHERE user_id = $1{}",
        suffix
    ))
    .bind(user_id.as_str())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| database_error("Failed to load flag overrides", e))?;

    let limits: Vec<LimitRow> = sqlx::query_as(&format!(
        "SELECT feature_key, limit_value, set_by, set_at FROM feature_limit_overrides WHERE user_id = $1{}",
        suffix
    ))
    .bind(user_id.as_str())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| database_error("Failed to load limit overrides", e))?;

    assemble(user_id, flags, limits)
}

#[async_trait]
impl OverrideStore for PostgresOverrideStore {
    async fn get(&self, user_id: &UserId) -> Result<FeatureOverrides, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to begin transaction", e))?;
        let overrides = load(&mut tx, user_id, false).await?;
        tx.commit()
            .await
            .map_err(|e| database_error("Failed to commit read", e))?;
        Ok(overrides)
    }

    async fn merge(
        &self,
        user_id: &UserId,
        patch: &OverridePatch,
        set_by: &AdminId,
        set_at: Timestamp,
    ) -> Result<OverrideMerge, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to begin transaction", e))?;

        let before = load(&mut tx, user_id, true).await?;
        let mut after = before.clone();
        after.merge(patch, set_by, set_at);

        for (key, value) in patch.iter() {
            if before.value(key) == Some(value) {
                continue;
            }
            match value {
                OverrideValue::Flag(enabled) => {
                    sqlx::query(
                        r#"
                        INSERT INTO feature_flag_overrides (user_id, feature_key, enabled, set_by, set_at)
                        VALUES ($1, $2, $3, $4, $5)
                        ON CONFLICT (user_id, feature_key)
                        DO UPDATE SET enabled = EXCLUDED.enabled, set_by = EXCLUDED.set_by, set_at = EXCLUDED.set_at
                        "#,
                    )
                    .bind(user_id.as_str())
                    .bind(key.as_str())
                    .bind(enabled)
                    .bind(set_by.as_str())
                    .bind(set_at.as_datetime())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| database_error("Failed to write flag override", e))?;
                }
                OverrideValue::Limit(limit) => {
                    sqlx::query(
                        r#"
                        INSERT INTO feature_limit_overrides (user_id, feature_key, limit_value, set_by, set_at)
                        VALUES ($1, $2, $3, $4, $5)
                        ON CONFLICT (user_id, feature_key)
                        DO UPDATE SET limit_value = EXCLUDED.limit_value, set_by = EXCLUDED.set_by, set_at = EXCLUDED.set_at
                        "#,
                    )
                    .bind(user_id.as_str())
                    .bind(key.as_str())
                    .bind(limit.as_sentinel())
                    .bind(set_by.as_str())
                    .bind(set_at.as_datetime())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| database_error("Failed to write limit override", e))?;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| database_error("Failed to commit override merge", e))?;

        Ok(OverrideMerge { before, after })
    }

    async fn clear(&self, user_id: &UserId) -> Result<FeatureOverrides, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("Failed to begin transaction", e))?;

        let flags: Vec<FlagRow> = sqlx::query_as(
            "DELETE FROM feature_flag_overrides WHERE user_id = $1 RETURNING feature_key, enabled, set_by, set_at",
        )
        .bind(user_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| database_error("Failed to delete flag overrides", e))?;

        let limits: Vec<LimitRow> = sqlx::query_as(
            "DELETE FROM feature_limit_overrides WHERE user_id = $1 RETURNING feature_key, limit_value, set_by, set_at",
        )
        .bind(user_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| database_error("Failed to delete limit overrides", e))?;

        tx.commit()
            .await
            .map_err(|e| database_error("Failed to commit override reset", e))?;

        assemble(user_id, flags, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn assemble_routes_rows_to_typed_maps() {
        let now = Utc::now();
        let overrides = assemble(
            &user(),
            vec![FlagRow {
                feature_key: "wearableSync".to_string(),
                enabled: true,
                set_by: "admin-1".to_string(),
                set_at: now,
            }],
            vec![LimitRow {
                feature_key: "maxMealPlansPerMonth".to_string(),
                limit_value: -1,
                set_by: "admin-1".to_string(),
                set_at: now,
            }],
        )
        .unwrap();

        assert_eq!(overrides.flag(FeatureKey::WearableSync), Some(true));
        assert_eq!(overrides.limit(FeatureKey::MaxMealPlansPerMonth), Some(Limit::Unlimited));
    }

    #[test]
    fn assemble_skips_unregistered_keys() {
        let overrides = assemble(
            &user(),
            vec![FlagRow {
                feature_key: "retiredFeature".to_string(),
                enabled: true,
                set_by: "admin-1".to_string(),
                set_at: Utc::now(),
            }],
            vec![],
        )
        .unwrap();

        assert!(overrides.is_empty());
    }

    #[test]
    fn assemble_skips_rows_of_the_wrong_kind() {
        let overrides = assemble(
            &user(),
            vec![],
            vec![LimitRow {
                feature_key: "wearableSync".to_string(),
                limit_value: 3,
                set_by: "admin-1".to_string(),
                set_at: Utc::now(),
            }],
        )
        .unwrap();

        assert!(overrides.is_empty());
    }

    #[test]
    fn assemble_rejects_invalid_limit() {
        let result = assemble(
            &user(),
            vec![],
            vec![LimitRow {
                feature_key: "maxMealPlansPerMonth".to_string(),
                limit_value: -7,
                set_by: "admin-1".to_string(),
                set_at: Utc::now(),
            }],
        );

        assert!(result.is_err());
    }
}
