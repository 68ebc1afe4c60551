use thiserror::Error;

/// Error for identifier parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Top-level error for all authentication operations.
///
/// Domain variants are expected outcomes that callers match on and may show
/// to end users. Infrastructure variants carry a diagnostic message and must
/// be logged and replaced with a generic message at the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    // Identity
    #[error("Identity already exists")]
    IdentityExists,

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Identity is blocked")]
    IdentityIsBlocked,

    // Same message as InvalidPassword so callers cannot enumerate identities.
    #[error("Invalid credentials")]
    InvalidIdentity,

    // Credential
    #[error("Credential not found")]
    CredentialNotFound,

    #[error("Cannot create credential: {0}")]
    CannotCreateCredential(String),

    #[error("Invalid credentials")]
    InvalidPassword,

    #[error("Cannot hash password: {0}")]
    CannotHashPassword(String),

    // Token
    #[error("Token does not exist")]
    TokenNotExist,

    #[error("Token is revoked")]
    TokenIsRevoked,

    #[error("Token is expired")]
    TokenIsExpired,

    #[error("Cannot create access token: {0}")]
    CannotCreateAccessToken(String),

    #[error("Cannot create refresh token: {0}")]
    CannotCreateRefreshToken(String),

    #[error("Invalid token")]
    InvalidToken,

    // Account
    #[error("Account already exists")]
    AccountExists,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Cannot create account: {0}")]
    CannotCreateAccount(String),

    // Reset password
    #[error("Reset password request not found")]
    ResetPasswordRequestNotFound,

    #[error("An active reset password request already exists")]
    ResetPasswordRequestExists,

    #[error("Reset password token not found")]
    ResetPasswordTokenNotFound,

    #[error("Reset password request is expired")]
    ResetPasswordRequestExpired,

    // Infrastructure errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Mail delivery failed: {0}")]
    MailDelivery(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Whether this is an expected domain outcome rather than an infrastructure failure.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            AuthError::CannotCreateCredential(_)
                | AuthError::CannotHashPassword(_)
                | AuthError::CannotCreateAccessToken(_)
                | AuthError::CannotCreateRefreshToken(_)
                | AuthError::CannotCreateAccount(_)
                | AuthError::DatabaseError(_)
                | AuthError::MailDelivery(_)
                | AuthError::Unknown(_)
        )
    }
}

impl From<auth::PasswordError> for AuthError {
    fn from(err: auth::PasswordError) -> Self {
        match err {
            auth::PasswordError::HashingFailed(msg) | auth::PasswordError::InvalidParameters(msg) => {
                AuthError::CannotHashPassword(msg)
            }
            auth::PasswordError::MalformedHash(msg) => {
                AuthError::Unknown(format!("Stored password hash is malformed: {}", msg))
            }
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Unknown(err.to_string())
    }
}
