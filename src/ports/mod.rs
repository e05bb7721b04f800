//! Ports - Interfaces between the application and its infrastructure.
//!
//! # Ports
//!
//! - `OverrideStore` - per-user flag and limit overrides
//! - `UsageCounterStore` - atomic, period-scoped usage counters
//! - `AuditLog` - append-only override audit trail
//! - `SubscriberReader` - subscription records from the account subsystem
//! - `AuditAlertSink` - alerting when an audit write is lost

mod audit_alert_sink;
mod audit_log;
mod override_store;
mod subscriber_reader;
mod usage_counter_store;

pub use audit_alert_sink::AuditAlertSink;
pub use audit_log::AuditLog;
pub use override_store::{OverrideMerge, OverrideStore};
pub use subscriber_reader::SubscriberReader;
pub use usage_counter_store::{UsageCounterStore, UsageKey, UsageStoreError};
