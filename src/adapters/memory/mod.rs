//! In-memory adapters for every entitlement port.
//!
//! Used by tests and by the `memory` storage backend.

mod audit_log;
mod override_store;
mod subscriber_reader;
mod usage_counter_store;

pub use audit_log::InMemoryAuditLog;
pub use override_store::InMemoryOverrideStore;
pub use subscriber_reader::InMemorySubscriberReader;
pub use usage_counter_store::InMemoryUsageCounterStore;
