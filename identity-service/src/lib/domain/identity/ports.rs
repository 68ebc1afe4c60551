use async_trait::async_trait;

use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;

/// Persistence operations for identities.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Persist a new identity.
    ///
    /// The stored status is the identity's own. Reads, including the
    /// returned value, report it blocked while its account is blocked.
    ///
    /// # Errors
    /// * `IdentityExists` - Identity string already taken (including a
    ///   uniqueness violation raised by the store under a race)
    /// * `AccountNotFound` - Owning account does not exist
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError>;

    /// Look up by identity string (e.g. an email address).
    ///
    /// # Errors
    /// * `IdentityNotFound` - No such identity
    async fn get(&self, identity: &str) -> Result<Identity, AuthError>;

    /// # Errors
    /// * `IdentityNotFound` - No such identity
    async fn get_by_id(&self, id: &IdentityId) -> Result<Identity, AuthError>;

    /// # Errors
    /// * `IdentityNotFound` - No such identity
    async fn add_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError>;

    /// # Errors
    /// * `IdentityNotFound` - No such identity
    async fn remove_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError>;
}

/// Finds accounts whose email was verified by another identity provider.
///
/// Lets a user who signed up through e.g. Google reset a password for the
/// same email address.
#[async_trait]
pub trait VerifiedEmailChecker: Send + Sync + 'static {
    /// # Errors
    /// * `IdentityNotFound` - No account has verified this email
    async fn find_account_id_by_verified_email(&self, email: &str)
        -> Result<AccountId, AuthError>;
}
