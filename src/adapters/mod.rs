//! Adapters - Implementations of the ports against real infrastructure.
//!
//! - `postgres` - overrides, usage counters, audit log and subscribers (sqlx)
//! - `redis` - usage counters
//! - `memory` - every port, for tests and single-node deployments
//! - `alerting` - audit failure alerts
//! - `http` - Axum routes

pub mod alerting;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod redis;
