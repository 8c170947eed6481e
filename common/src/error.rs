//! Validation errors for shared value types.

use thiserror::Error;

/// Errors raised while constructing or validating common types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Currency pair with an empty side.
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    /// No e-mail address supplied.
    #[error("missing email")]
    MissingEmail,

    /// Malformed e-mail address.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

impl CommonError {
    /// Get error code for outer layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            CommonError::InvalidCurrency(_) => "INVALID_CURRENCY",
            CommonError::MissingEmail => "MISSING_EMAIL",
            CommonError::InvalidEmail(_) => "INVALID_EMAIL",
        }
    }
}

/// Result type alias for common validation.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Joins several error messages into one line, `"; "` separated.
pub fn join_messages<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
