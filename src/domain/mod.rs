//! Domain layer - Pure entitlement logic and shared primitives.

pub mod entitlement;
pub mod foundation;
