//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the entitlement domain.

mod errors;
mod ids;
mod period_key;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AdminId, AuditEntryId, UserId};
pub use period_key::PeriodKey;
pub use timestamp::Timestamp;
