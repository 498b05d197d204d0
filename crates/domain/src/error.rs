//! Domain errors
//!
//! Pure validation errors with no infrastructure dependencies.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
