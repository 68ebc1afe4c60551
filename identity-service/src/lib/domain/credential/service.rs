use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::account::models::Account;
use crate::domain::account::models::AccountId;
use crate::domain::account::ports::AccountRepository;
use crate::domain::credential::models::Credential;
use crate::domain::credential::models::CredentialKind;
use crate::domain::credential::ports::CredentialRepository;
use crate::domain::credential::ports::CredentialServicePort;
use crate::domain::credential::ports::RegisterCommand;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::Identity;
use crate::domain::identity::ports::IdentityRepository;
use crate::domain::performer::Performer;
use crate::domain::time::Clock;
use crate::domain::token::models::SessionId;
use crate::domain::token::ports::TokenRepository;

/// Password-based registration and authentication.
///
/// Passwords are hashed with Argon2id; the pluggable token hash strategy is
/// never used for them.
pub struct CredentialAuthenticator<AR, IR, CR, TR>
where
    AR: AccountRepository,
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
{
    accounts: Arc<AR>,
    identities: Arc<IR>,
    credentials: Arc<CR>,
    tokens: Arc<TR>,
    password_hasher: auth::PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl<AR, IR, CR, TR> CredentialAuthenticator<AR, IR, CR, TR>
where
    AR: AccountRepository,
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
{
    pub fn new(
        accounts: Arc<AR>,
        identities: Arc<IR>,
        credentials: Arc<CR>,
        tokens: Arc<TR>,
        password_hasher: auth::PasswordHasher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            identities,
            credentials,
            tokens,
            password_hasher,
            clock,
        }
    }

    async fn ensure_identity_is_free(&self, identity: &str) -> Result<(), AuthError> {
        match self.identities.get(identity).await {
            Ok(existing) if existing.is_blocked() => Err(AuthError::IdentityIsBlocked),
            Ok(_) => Err(AuthError::IdentityExists),
            Err(AuthError::IdentityNotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Writes that follow account creation. Any failure here is compensated
    /// by the caller.
    async fn attach_identity_and_password(
        &self,
        account: &Account,
        identity: Identity,
        password_hash: String,
        roles: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.identities.create(identity).await?;
        self.credentials
            .create(Credential::password(account.id, password_hash, now))
            .await?;
        if !roles.is_empty() {
            self.accounts.add_roles(&account.id, roles).await?;
        }
        Ok(())
    }

    /// Current password credential, with expired or missing both reported
    /// as a wrong password.
    async fn current_password(
        &self,
        account_id: &AccountId,
        now: DateTime<Utc>,
    ) -> Result<Credential, AuthError> {
        match self
            .credentials
            .get_last(account_id, CredentialKind::Password)
            .await
        {
            Ok(credential) if !credential.is_expired(now) => Ok(credential),
            Ok(_) | Err(AuthError::CredentialNotFound) => Err(AuthError::InvalidPassword),
            Err(e) => Err(e),
        }
    }

    fn verify_password(&self, password: &str, credential: &Credential) -> Result<(), AuthError> {
        if self.password_hasher.verify(password, &credential.hash)? {
            Ok(())
        } else {
            Err(AuthError::InvalidPassword)
        }
    }
}

#[async_trait]
impl<AR, IR, CR, TR> CredentialServicePort for CredentialAuthenticator<AR, IR, CR, TR>
where
    AR: AccountRepository,
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<Account, AuthError> {
        self.ensure_identity_is_free(&command.identity).await?;

        let now = self.clock.now();
        let account = Account::new(serde_json::json!({}), now);
        let identity = Identity::new(
            account.id,
            command.identity,
            command.kind,
            command.metadata,
            now,
        )?;
        // Hash before the first write so a hashing failure leaves nothing behind.
        let password_hash = self.password_hasher.hash(&command.password)?;

        let mut account = self.accounts.create(account).await?;

        if let Err(e) = self
            .attach_identity_and_password(&account, identity, password_hash, &command.roles, now)
            .await
        {
            tracing::warn!(
                account_id = %account.id,
                error = %e,
                "Registration failed after account creation, removing account"
            );
            if let Err(cleanup) = self.accounts.remove_account(&account.id).await {
                tracing::error!(
                    account_id = %account.id,
                    error = %cleanup,
                    "Failed to remove partially registered account"
                );
            }
            return Err(e);
        }

        account.roles.extend(command.roles);
        tracing::info!(account_id = %account.id, "Account registered");

        Ok(account)
    }

    async fn authenticate(&self, identity: &str, password: &str) -> Result<Performer, AuthError> {
        let identity = match self.identities.get(identity).await {
            Ok(identity) => identity,
            Err(AuthError::IdentityNotFound) => return Err(AuthError::InvalidIdentity),
            Err(e) => return Err(e),
        };

        if identity.is_blocked() {
            tracing::warn!(identity_id = %identity.id, "Authentication attempt on blocked identity");
            return Err(AuthError::IdentityIsBlocked);
        }

        let now = self.clock.now();
        let credential = self.current_password(&identity.account_id, now).await?;
        if let Err(e) = self.verify_password(password, &credential) {
            tracing::warn!(identity_id = %identity.id, "Password mismatch");
            return Err(e);
        }

        Ok(Performer {
            id: identity.account_id,
            session_id: SessionId::new(),
            roles: identity.roles,
            identity_id: identity.id,
        })
    }

    async fn change_password(
        &self,
        account_id: &AccountId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let now = self.clock.now();
        let credential = self.current_password(account_id, now).await?;
        self.verify_password(current_password, &credential)?;

        let password_hash = self.password_hasher.hash(new_password)?;
        self.credentials
            .replace_credentials(account_id, Credential::password(*account_id, password_hash, now))
            .await?;
        self.tokens.revoke_user_tokens(account_id, now).await?;

        tracing::info!(account_id = %account_id, "Password changed, all sessions revoked");

        Ok(())
    }
}
