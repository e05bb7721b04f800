//! Redis adapters.

mod usage_counter_store;

pub use usage_counter_store::{RedisUsageCounterStore, DEFAULT_KEY_PREFIX};
