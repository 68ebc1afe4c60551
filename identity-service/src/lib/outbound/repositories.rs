pub mod account;
pub mod credential;
pub mod identity;
pub mod memory;
pub mod reset_password;
pub mod token;

pub use account::PostgresAccountRepository;
pub use credential::PostgresCredentialRepository;
pub use identity::PostgresIdentityRepository;
pub use memory::InMemoryStore;
pub use reset_password::PostgresResetPasswordRequestRepository;
pub use token::PostgresTokenRepository;

/// Map a driver error to the domain's infrastructure variant.
pub(crate) fn database_error(err: sqlx::Error) -> crate::domain::errors::AuthError {
    crate::domain::errors::AuthError::DatabaseError(err.to_string())
}

/// Whether the error is a unique violation on the named constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation() && db_err.constraint() == Some(constraint))
}
