use thiserror::Error;

/// Error type for bearer token primitives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unknown token hash strategy: {0}")]
    UnknownStrategy(String),

    #[error("Token hash salt must not be empty")]
    EmptySalt,
}
