//! Entitlement-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | InvalidResetToken | 403 |
//! | CounterUpdate | 503 |
//! | Infrastructure | 500 |

use thiserror::Error;

use super::ResetTokenError;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced by entitlement operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A usage counter could not be updated within the retry budget.
    /// Callers must treat the feature as over its limit.
    #[error("usage counter update failed after {attempts} attempts: {reason}")]
    CounterUpdate { attempts: u32, reason: String },

    #[error("invalid reset token: {0}")]
    InvalidResetToken(#[from] ResetTokenError),

    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl EntitlementError {
    pub fn counter_update(attempts: u32, reason: impl Into<String>) -> Self {
        EntitlementError::CounterUpdate {
            attempts,
            reason: reason.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        EntitlementError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EntitlementError::Validation(ValidationError::EmptyField { .. }) => ErrorCode::EmptyField,
            EntitlementError::Validation(ValidationError::OutOfRange { .. }) => ErrorCode::OutOfRange,
            EntitlementError::Validation(ValidationError::InvalidFormat { .. }) => {
                ErrorCode::InvalidFormat
            }
            EntitlementError::Validation(_) => ErrorCode::ValidationFailed,
            EntitlementError::CounterUpdate { .. } => ErrorCode::Contention,
            EntitlementError::InvalidResetToken(_) => ErrorCode::Forbidden,
            EntitlementError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }
}

impl From<DomainError> for EntitlementError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                EntitlementError::Validation(ValidationError::invalid_format(field, err.message))
            }
            _ => EntitlementError::Infrastructure(err.to_string()),
        }
    }
}

impl From<EntitlementError> for DomainError {
    fn from(err: EntitlementError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
