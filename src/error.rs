//! Crate-wide error type
//!
//! Every operation that can be driven from outside the core (admission,
//! cancellation, a worker tick) returns `Result<_, CoreError>`. The variants
//! mirror the stable error codes the external GraphQL layer is expected to
//! surface to clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("only one bet order at a time per user")]
    RateLimit,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable code surfaced to API callers (spec §7).
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::InvalidState(_) => "INVALID_STATE",
            CoreError::InvalidArgument(_) => "INVALID_ARGUMENT",
            CoreError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            CoreError::RateLimit => "RATE_LIMIT",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(CoreError::RateLimit.code(), "RATE_LIMIT");
        assert_eq!(CoreError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(CoreError::NotFound("bet".into()).code(), "NOT_FOUND");
    }
}
