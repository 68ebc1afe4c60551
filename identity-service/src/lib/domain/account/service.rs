use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::account::models::Account;
use crate::domain::account::models::AccountId;
use crate::domain::account::ports::AccountRepository;
use crate::domain::account::ports::AccountServicePort;
use crate::domain::errors::AuthError;
use crate::domain::time::Clock;
use crate::domain::token::ports::TokenRepository;

/// Account administration service implementation.
pub struct AccountService<AR, TR>
where
    AR: AccountRepository,
    TR: TokenRepository,
{
    accounts: Arc<AR>,
    tokens: Arc<TR>,
    clock: Arc<dyn Clock>,
}

impl<AR, TR> AccountService<AR, TR>
where
    AR: AccountRepository,
    TR: TokenRepository,
{
    pub fn new(accounts: Arc<AR>, tokens: Arc<TR>, clock: Arc<dyn Clock>) -> Self {
        Self {
            accounts,
            tokens,
            clock,
        }
    }

    async fn revoke_everything(&self, id: &AccountId) -> Result<(), AuthError> {
        self.tokens.revoke_user_tokens(id, self.clock.now()).await
    }
}

#[async_trait]
impl<AR, TR> AccountServicePort for AccountService<AR, TR>
where
    AR: AccountRepository,
    TR: TokenRepository,
{
    async fn get_account(&self, id: &AccountId) -> Result<Account, AuthError> {
        self.accounts.get(id).await
    }

    async fn add_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError> {
        self.accounts.add_roles(id, roles).await?;
        tracing::info!(account_id = %id, roles = ?roles, "Roles granted");
        Ok(())
    }

    async fn remove_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError> {
        self.accounts.remove_roles(id, roles).await?;
        tracing::info!(account_id = %id, roles = ?roles, "Roles withdrawn");
        Ok(())
    }

    async fn block_account(&self, id: &AccountId) -> Result<(), AuthError> {
        self.accounts.block_account(id).await?;
        self.revoke_everything(id).await?;
        tracing::info!(account_id = %id, "Account blocked");
        Ok(())
    }

    async fn unblock_account(&self, id: &AccountId) -> Result<(), AuthError> {
        self.accounts.unblock_account(id).await?;
        tracing::info!(account_id = %id, "Account unblocked");
        Ok(())
    }

    async fn remove_account(&self, id: &AccountId) -> Result<(), AuthError> {
        self.accounts.remove_account(id).await?;
        self.revoke_everything(id).await?;
        tracing::info!(account_id = %id, "Account removed");
        Ok(())
    }
}
