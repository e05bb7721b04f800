//! Mapping from sqlx errors to port error types.

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::UsageStoreError;

/// SQLSTATE codes that indicate a retryable conflict:
/// serialization_failure, deadlock_detected, lock_not_available.
const CONTENTION_STATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// SQLSTATE numeric_value_out_of_range.
const OUT_OF_RANGE_STATE: &str = "22003";

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Classifies a failure from a counter query.
pub(super) fn usage_error(err: sqlx::Error) -> UsageStoreError {
    if let Some(state) = sqlstate(&err) {
        if CONTENTION_STATES.contains(&state.as_str()) {
            return UsageStoreError::Contention(format!("sqlstate {}: {}", state, err));
        }
        if state == OUT_OF_RANGE_STATE {
            return UsageStoreError::Overflow;
        }
    }

    match err {
        sqlx::Error::PoolTimedOut => UsageStoreError::Contention("connection pool timed out".to_string()),
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed => UsageStoreError::Unavailable(err.to_string()),
        other => UsageStoreError::Fatal(other.to_string()),
    }
}

/// Wraps a failure from any other query.
pub(super) fn database_error(context: &str, err: sqlx::Error) -> DomainError {
    let mut domain = DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err));
    if let Some(state) = sqlstate(&err) {
        domain = domain.with_detail("sqlstate", state);
    }
    domain
}

/// A stored value that no longer parses.
pub(super) fn corrupt_row(what: &str, reason: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid {} in row: {}", what, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_contention() {
        assert!(matches!(
            usage_error(sqlx::Error::PoolTimedOut),
            UsageStoreError::Contention(_)
        ));
    }

    #[test]
    fn closed_pool_is_unavailable() {
        assert!(usage_error(sqlx::Error::PoolClosed).is_transient());
    }

    #[test]
    fn row_not_found_is_fatal() {
        assert!(matches!(
            usage_error(sqlx::Error::RowNotFound),
            UsageStoreError::Fatal(_)
        ));
    }

    #[test]
    fn database_error_keeps_context() {
        let err = database_error("Failed to load overrides", sqlx::Error::RowNotFound);
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.starts_with("Failed to load overrides"));
    }
}
