//! Error taxonomy for the reservation engine.

use thiserror::Error;
use vaxsched_domain::{DomainError, ScheduleDate};

/// Errors that can occur in scheduler operations.
///
/// Everything except `Storage` is a business-rule failure and must not
/// be retried; `Storage` failures caused by a competing writer are the
/// one retryable class (see [`SchedulerError::is_retryable`]).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Malformed input (date or username) rejected before storage.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Unknown vaccine: {0}")]
    UnknownVaccine(String),

    #[error("Not enough available doses of {0}")]
    NotEnoughDoses(String),

    #[error("No caregiver is available on {0}")]
    NoCaregiverAvailable(ScheduleDate),

    /// Also reported when the appointment exists but belongs to someone
    /// else, so callers cannot probe which ids exist.
    #[error("Appointment not found: id={0}")]
    NotFound(i64),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Availability slot not found: {caregiver} on {date}")]
    SlotNotFound {
        date: ScheduleDate,
        caregiver: String,
    },

    #[error("Cancellation conflicts with re-uploaded slot: {caregiver} on {date}")]
    SlotConflict {
        date: ScheduleDate,
        caregiver: String,
    },

    #[error("Dose amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Whether the failure is transient and the caller may retry.
    ///
    /// Only busy/locked storage conflicts qualify; business-rule
    /// failures are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            SchedulerError::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// True when the underlying SQLite error is a uniqueness or CHECK
/// constraint violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rule_failures_are_not_retryable() {
        assert!(!SchedulerError::UnknownVaccine("pfizer".to_string()).is_retryable());
        assert!(!SchedulerError::NotFound(1).is_retryable());
        assert!(!SchedulerError::InvalidAmount(0).is_retryable());
    }

    #[test]
    fn test_busy_storage_failure_is_retryable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(SchedulerError::Storage(busy).is_retryable());
    }

    #[test]
    fn test_constraint_violation_is_not_retryable() {
        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(is_constraint_violation(&constraint));
        assert!(!SchedulerError::Storage(constraint).is_retryable());
    }
}
