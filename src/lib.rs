//! Entitlement Engine - Feature access and quota resolution
//!
//! Combines a ranked tier catalog, per-user administrative overrides and
//! period-scoped usage counters into a single decision per feature, with an
//! audit trail for every override change.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
