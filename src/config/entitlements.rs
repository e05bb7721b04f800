//! Entitlement engine configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::application::services::RetryConfig;
use crate::domain::entitlement::MAX_TOKEN_TTL;

/// Upper bound on configured counter attempts.
const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Shortest reset secret accepted in production.
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Where overrides, audit entries and subscribers live.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

/// Where usage counters live.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    #[default]
    Postgres,
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementsConfig {
    /// YAML tier catalog. The built-in standard catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub storage_backend: StorageBackend,

    #[serde(default)]
    pub counter_backend: CounterBackend,

    /// Total attempts for a counter operation, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub retry_initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub retry_max_backoff_ms: u64,

    /// HMAC key for override reset tokens
    pub reset_token_secret: SecretString,

    #[serde(default = "default_reset_ttl")]
    pub reset_token_ttl_secs: u64,
}

impl EntitlementsConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            initial_delay: Duration::from_millis(self.retry_initial_backoff_ms),
            max_delay: Duration::from_millis(self.retry_max_backoff_ms),
            ..RetryConfig::default()
        }
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_token_ttl_secs)
    }

    pub fn needs_postgres(&self) -> bool {
        self.storage_backend == StorageBackend::Postgres
            || self.counter_backend == CounterBackend::Postgres
    }

    pub fn needs_redis(&self) -> bool {
        self.counter_backend == CounterBackend::Redis
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if !(1..=MAX_RETRY_ATTEMPTS).contains(&self.retry_max_attempts) {
            return Err(ValidationError::InvalidRetryAttempts {
                max: MAX_RETRY_ATTEMPTS,
            });
        }
        if self.retry_initial_backoff_ms > self.retry_max_backoff_ms {
            return Err(ValidationError::InvalidRetryBackoff);
        }

        let secret_len = self.reset_token_secret.expose_secret().len();
        if secret_len == 0 {
            return Err(ValidationError::MissingRequired(
                "ENTITLEMENTS__RESET_TOKEN_SECRET",
            ));
        }
        if *environment == Environment::Production && secret_len < MIN_PRODUCTION_SECRET_LEN {
            return Err(ValidationError::ResetSecretTooShort {
                min: MIN_PRODUCTION_SECRET_LEN,
            });
        }

        if self.reset_token_ttl_secs == 0 || self.reset_token_ttl() > MAX_TOKEN_TTL {
            return Err(ValidationError::InvalidResetTtl {
                max_secs: MAX_TOKEN_TTL.as_secs(),
            });
        }
        Ok(())
    }
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    25
}

fn default_max_backoff() -> u64 {
    500
}

fn default_reset_ttl() -> u64 {
    15 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> EntitlementsConfig {
        EntitlementsConfig {
            catalog_path: None,
            storage_backend: StorageBackend::Memory,
            counter_backend: CounterBackend::Memory,
            retry_max_attempts: default_retry_attempts(),
            retry_initial_backoff_ms: default_initial_backoff(),
            retry_max_backoff_ms: default_max_backoff(),
            reset_token_secret: SecretString::new(secret.to_string()),
            reset_token_ttl_secs: default_reset_ttl(),
        }
    }

    #[test]
    fn retry_config_follows_settings() {
        let retry = config("secret").retry();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.initial_delay, Duration::from_millis(25));
        assert_eq!(retry.max_delay, Duration::from_millis(500));
    }

    #[test]
    fn backends_decide_required_services() {
        let mut config = config("secret");
        assert!(!config.needs_postgres());
        assert!(!config.needs_redis());

        config.counter_backend = CounterBackend::Redis;
        assert!(config.needs_redis());
        assert!(!config.needs_postgres());

        config.storage_backend = StorageBackend::Postgres;
        assert!(config.needs_postgres());
    }

    #[test]
    fn short_secret_is_rejected_only_in_production() {
        let config = config("short");
        assert!(config.validate(&Environment::Development).is_ok());
        assert_eq!(
            config.validate(&Environment::Production),
            Err(ValidationError::ResetSecretTooShort { min: 32 })
        );
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            config("").validate(&Environment::Development),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn retry_bounds_are_checked() {
        let mut zero = config("secret");
        zero.retry_max_attempts = 0;
        assert_eq!(
            zero.validate(&Environment::Development),
            Err(ValidationError::InvalidRetryAttempts { max: 10 })
        );

        let mut inverted = config("secret");
        inverted.retry_initial_backoff_ms = 1_000;
        assert_eq!(
            inverted.validate(&Environment::Development),
            Err(ValidationError::InvalidRetryBackoff)
        );
    }

    #[test]
    fn reset_ttl_is_bounded() {
        let mut config = config("secret");
        config.reset_token_ttl_secs = MAX_TOKEN_TTL.as_secs() + 1;
        assert!(matches!(
            config.validate(&Environment::Development),
            Err(ValidationError::InvalidResetTtl { .. })
        ));
    }
}
