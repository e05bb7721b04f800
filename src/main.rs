//! Entitlement engine HTTP server.
//!
//! Loads configuration, builds the catalog and storage backends, and serves
//! the entitlement routes until interrupted.

use std::sync::Arc;

use http::HeaderName;
use sqlx::PgPool;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use entitlement_engine::adapters::alerting::TracingAuditAlertSink;
use entitlement_engine::adapters::http::{entitlement_router, EntitlementAppState};
use entitlement_engine::adapters::memory::{
    InMemoryAuditLog, InMemoryOverrideStore, InMemorySubscriberReader, InMemoryUsageCounterStore,
};
use entitlement_engine::adapters::postgres::{
    PostgresAuditLog, PostgresOverrideStore, PostgresSubscriberReader, PostgresUsageCounterStore,
};
use entitlement_engine::adapters::redis::RedisUsageCounterStore;
use entitlement_engine::application::services::{AuditLogger, UsageCounterService};
use entitlement_engine::config::{
    AppConfig, ConfigError, CounterBackend, RedisConfig, StorageBackend, ValidationError,
};
use entitlement_engine::domain::entitlement::{CatalogError, ResetTokenSigner, TierCatalog};
use entitlement_engine::ports::{AuditLog, OverrideStore, SubscriberReader, UsageCounterStore};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("a postgres backend is configured but no database pool was created")]
    MissingDatabase,

    #[error("redis connection failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis connection timed out")]
    RedisTimeout,

    #[error("invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage for overrides, audit entries and subscribers.
struct Stores {
    subscribers: Arc<dyn SubscriberReader>,
    overrides: Arc<dyn OverrideStore>,
    audit_log: Arc<dyn AuditLog>,
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate().map_err(ConfigError::from)?;

    let catalog = Arc::new(load_catalog(&config)?);

    let pool = if config.entitlements.needs_postgres() {
        Some(connect_postgres(&config).await?)
    } else {
        None
    };

    let stores = build_stores(config.entitlements.storage_backend, pool.as_ref())?;
    let counter_store = build_counter_store(&config, pool.as_ref()).await?;

    let counters = Arc::new(UsageCounterService::new(
        counter_store,
        config.entitlements.retry(),
    ));
    let audit = Arc::new(AuditLogger::new(
        stores.audit_log,
        Arc::new(TracingAuditAlertSink::new()),
    ));
    let signer = Arc::new(ResetTokenSigner::new(
        config.entitlements.reset_token_secret.clone(),
        config.entitlements.reset_token_ttl(),
    ));

    let state = EntitlementAppState::new(
        catalog,
        stores.subscribers,
        stores.overrides,
        counters,
        audit,
        signer,
    );

    let request_id = HeaderName::from_static("x-request-id");
    let app = entitlement_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "entitlement engine listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("entitlement engine stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_catalog(config: &AppConfig) -> Result<TierCatalog, CatalogError> {
    let catalog = match &config.entitlements.catalog_path {
        Some(path) => {
            let catalog = TierCatalog::from_path(path)?;
            tracing::info!(path = %path.display(), tiers = catalog.list_tiers().len(), "tier catalog loaded");
            catalog
        }
        None => {
            tracing::info!("using built-in tier catalog");
            TierCatalog::standard()
        }
    };

    for violation in catalog.monotonicity_violations() {
        tracing::warn!(%violation, "tier catalog is not monotonic");
    }
    Ok(catalog)
}

async fn connect_postgres(config: &AppConfig) -> Result<PgPool, StartupError> {
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }
    Ok(pool)
}

fn build_stores(backend: StorageBackend, pool: Option<&PgPool>) -> Result<Stores, StartupError> {
    match backend {
        StorageBackend::Postgres => {
            let pool = pool.ok_or(StartupError::MissingDatabase)?;
            Ok(Stores {
                subscribers: Arc::new(PostgresSubscriberReader::new(pool.clone())),
                overrides: Arc::new(PostgresOverrideStore::new(pool.clone())),
                audit_log: Arc::new(PostgresAuditLog::new(pool.clone())),
            })
        }
        StorageBackend::Memory => {
            tracing::warn!("memory storage backend: overrides and audit entries are not persisted");
            Ok(Stores {
                subscribers: Arc::new(InMemorySubscriberReader::new()),
                overrides: Arc::new(InMemoryOverrideStore::new()),
                audit_log: Arc::new(InMemoryAuditLog::new()),
            })
        }
    }
}

async fn build_counter_store(
    config: &AppConfig,
    pool: Option<&PgPool>,
) -> Result<Arc<dyn UsageCounterStore>, StartupError> {
    match config.entitlements.counter_backend {
        CounterBackend::Postgres => {
            let pool = pool.ok_or(StartupError::MissingDatabase)?;
            Ok(Arc::new(PostgresUsageCounterStore::new(pool.clone())))
        }
        CounterBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .ok_or(ConfigError::from(ValidationError::MissingRequired("REDIS__URL")))?;
            Ok(Arc::new(connect_redis(redis).await?))
        }
        CounterBackend::Memory => {
            tracing::warn!("memory counter backend: usage is not shared between instances");
            Ok(Arc::new(InMemoryUsageCounterStore::new()))
        }
    }
}

async fn connect_redis(config: &RedisConfig) -> Result<RedisUsageCounterStore, StartupError> {
    let client = redis::Client::open(config.url.as_str())?;
    let conn = tokio::time::timeout(config.timeout(), client.get_multiplexed_async_connection())
        .await
        .map_err(|_| StartupError::RedisTimeout)??;

    tracing::info!(prefix = %config.key_prefix, "redis usage counters connected");
    Ok(RedisUsageCounterStore::with_prefix(conn, config.key_prefix.clone()))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(error) => {
            tracing::error!(%error, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
