use async_trait::async_trait;

use crate::domain::account::models::Account;
use crate::domain::account::models::AccountId;
use crate::domain::credential::models::Credential;
use crate::domain::credential::models::CredentialKind;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::IdentityKind;
use crate::domain::performer::Performer;

/// Registration input.
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub identity: String,
    pub password: String,
    pub kind: IdentityKind,
    pub roles: Vec<String>,
    pub metadata: serde_json::Value,
}

/// Port for password-based registration and authentication.
#[async_trait]
pub trait CredentialServicePort: Send + Sync + 'static {
    /// Register a new account with one identity and a password credential.
    ///
    /// # Returns
    /// Created account, roles included
    ///
    /// # Errors
    /// * `IdentityExists` - Identity string already registered
    /// * `IdentityIsBlocked` - Identity exists and is blocked
    /// * `InvalidEmail` - Email identity is not a valid address
    /// * `CannotHashPassword` - Password hashing failed
    async fn register(&self, command: RegisterCommand) -> Result<Account, AuthError>;

    /// Check an identity and password pair.
    ///
    /// # Returns
    /// Performer with a placeholder session id; the real session is
    /// allocated when tokens are issued
    ///
    /// # Errors
    /// * `InvalidIdentity` - Unknown identity
    /// * `IdentityIsBlocked` - Identity is blocked
    /// * `InvalidPassword` - No password credential, or mismatch
    async fn authenticate(&self, identity: &str, password: &str) -> Result<Performer, AuthError>;

    /// Replace the password after checking the current one, then log out everywhere.
    ///
    /// # Errors
    /// * `InvalidPassword` - Current password does not match
    /// * `CannotHashPassword` - Password hashing failed
    async fn change_password(
        &self,
        account_id: &AccountId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

/// Persistence operations for credentials.
///
/// Lookups follow "last credential wins": `get_last` returns the most
/// recently created credential of a kind, with insertion order breaking
/// ties between equal `created_at` values. Older rows are left in place and
/// ignored.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    /// # Errors
    /// * `CannotCreateCredential` - Store rejected the write
    async fn create(&self, credential: Credential) -> Result<Credential, AuthError>;

    /// # Errors
    /// * `CredentialNotFound` - Owner has no credential of this kind
    async fn get_last(
        &self,
        owner_id: &AccountId,
        kind: CredentialKind,
    ) -> Result<Credential, AuthError>;

    /// Delete every credential of the owner. Deleting nothing is not an error.
    async fn remove_credentials(&self, owner_id: &AccountId) -> Result<(), AuthError>;

    /// Delete every credential of the owner and store `credential`, atomically.
    ///
    /// # Errors
    /// * `CannotCreateCredential` - Store rejected the write; old credentials are kept
    async fn replace_credentials(
        &self,
        owner_id: &AccountId,
        credential: Credential,
    ) -> Result<Credential, AuthError>;
}
