//! Core error types.

use thiserror::Error;

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by domain-level checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Token error: {0}")]
    Token(String),
}
