//! Application configuration module
//!
//! Configuration is loaded from the environment with the `config` and
//! `dotenvy` crates. Variables use the `ENTITLEMENT_ENGINE` prefix and `__`
//! between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use entitlement_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod entitlements;
mod error;
mod redis;
mod server;

pub use database::DatabaseConfig;
pub use entitlements::{CounterBackend, EntitlementsConfig, StorageBackend};
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Used by every `postgres` backend
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Required when counters live in Redis
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    pub entitlements: EntitlementsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present
    /// 2. Reads variables with the `ENTITLEMENT_ENGINE` prefix
    /// 3. Uses `__` to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `ENTITLEMENT_ENGINE__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ENTITLEMENT_ENGINE__ENTITLEMENTS__COUNTER_BACKEND=redis`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("ENTITLEMENT_ENGINE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic checks across sections.
    ///
    /// Database and Redis settings are only checked when a configured
    /// backend uses them.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.entitlements.validate(&self.server.environment)?;

        if self.entitlements.needs_postgres() {
            self.database.validate()?;
        }
        if self.entitlements.needs_redis() {
            self.redis
                .as_ref()
                .ok_or(ValidationError::MissingRequired("REDIS__URL"))?
                .validate()?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
