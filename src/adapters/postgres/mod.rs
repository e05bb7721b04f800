//! PostgreSQL adapters - Database implementations of the entitlement ports.
//!
//! - `PostgresOverrideStore` - flag and limit override tables
//! - `PostgresUsageCounterStore` - atomic upsert-and-add counters
//! - `PostgresAuditLog` - append-only audit table with JSONB diffs
//! - `PostgresSubscriberReader` - subscription records

mod audit_log;
mod errors;
mod override_store;
mod subscriber_reader;
mod usage_counter_store;

pub use audit_log::PostgresAuditLog;
pub use override_store::PostgresOverrideStore;
pub use subscriber_reader::PostgresSubscriberReader;
pub use usage_counter_store::PostgresUsageCounterStore;
