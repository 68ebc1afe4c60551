use async_trait::async_trait;

use crate::domain::account::models::Account;
use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;

/// Port for account administration.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    async fn get_account(&self, id: &AccountId) -> Result<Account, AuthError>;

    /// Grant roles. Tokens issued earlier keep their role snapshot.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    async fn add_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError>;

    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    async fn remove_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError>;

    /// Block the account and all its identities, then revoke every token it holds.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    /// * `DatabaseError` - Storage transaction failed and was rolled back
    async fn block_account(&self, id: &AccountId) -> Result<(), AuthError>;

    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    async fn unblock_account(&self, id: &AccountId) -> Result<(), AuthError>;

    /// Delete the account with its identities and credentials, then revoke its tokens.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    /// * `DatabaseError` - Storage transaction failed and was rolled back
    async fn remove_account(&self, id: &AccountId) -> Result<(), AuthError>;
}

/// Persistence operations for the account aggregate.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Persist a new account.
    ///
    /// # Errors
    /// * `AccountExists` - Identifier already taken
    /// * `CannotCreateAccount` - Store rejected the write
    async fn create(&self, account: Account) -> Result<Account, AuthError>;

    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    /// * `DatabaseError` - Database operation failed
    async fn get(&self, id: &AccountId) -> Result<Account, AuthError>;

    /// Add roles; roles already present are ignored.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    async fn add_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError>;

    /// Remove roles; roles not present are ignored.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    async fn remove_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError>;

    /// Delete the account, its identities and its credentials in one transaction.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    /// * `DatabaseError` - Transaction failed; nothing was deleted
    async fn remove_account(&self, id: &AccountId) -> Result<(), AuthError>;

    /// Mark the account blocked. Every identity of it reads as blocked from
    /// then on; the identities' own status is left untouched.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    /// * `DatabaseError` - Write failed; nothing was changed
    async fn block_account(&self, id: &AccountId) -> Result<(), AuthError>;

    /// Reverse of `block_account`. Identities blocked in their own right
    /// stay blocked.
    ///
    /// # Errors
    /// * `AccountNotFound` - Account does not exist
    async fn unblock_account(&self, id: &AccountId) -> Result<(), AuthError>;
}
