use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::account::models::Account;
use crate::domain::account::models::AccountId;
use crate::domain::account::models::Status;
use crate::domain::account::ports::AccountRepository;
use crate::domain::credential::models::Credential;
use crate::domain::credential::models::CredentialKind;
use crate::domain::credential::ports::CredentialRepository;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::ports::IdentityRepository;
use crate::domain::reset_password::models::ResetPasswordRequest;
use crate::domain::reset_password::ports::ResetPasswordRequestRepository;
use crate::domain::token::models::AccessToken;
use crate::domain::token::models::RefreshToken;
use crate::domain::token::models::SessionId;
use crate::domain::token::ports::TokenRepository;

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    // Identity roles and status here are the identity's own; reads merge in the account's.
    identities: HashMap<IdentityId, Identity>,
    // Insertion order doubles as creation order.
    credentials: Vec<Credential>,
    access_tokens: HashMap<String, AccessToken>,
    refresh_tokens: HashMap<String, RefreshToken>,
    reset_requests: Vec<ResetPasswordRequest>,
}

impl State {
    fn account_mut(&mut self, id: &AccountId) -> Result<&mut Account, AuthError> {
        self.accounts.get_mut(id).ok_or(AuthError::AccountNotFound)
    }

    fn identity_mut(&mut self, id: &IdentityId) -> Result<&mut Identity, AuthError> {
        self.identities.get_mut(id).ok_or(AuthError::IdentityNotFound)
    }

    /// Identity as callers see it: effective roles, and blocked if the account is.
    fn resolve(&self, identity: &Identity) -> Identity {
        let mut resolved = identity.clone();
        if let Some(account) = self.accounts.get(&identity.account_id) {
            resolved.roles.extend(account.roles.iter().cloned());
            if account.is_blocked() {
                resolved.status = Status::Blocked;
            }
        }
        resolved
    }
}

/// Earlier revocation times win, so a scheduled revocation can only be
/// brought forward and repeats are no-ops.
fn revoke(slot: &mut Option<DateTime<Utc>>, at: DateTime<Utc>) {
    *slot = Some(slot.map_or(at, |existing| existing.min(at)));
}

/// Process-local store implementing every repository port.
///
/// All state sits behind one lock, so each operation is atomic with respect
/// to the others. Used by the integration tests and the `demo` command.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn create(&self, account: Account) -> Result<Account, AuthError> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(AuthError::AccountExists);
        }
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get(&self, id: &AccountId) -> Result<Account, AuthError> {
        let state = self.state.read().await;
        state.accounts.get(id).cloned().ok_or(AuthError::AccountNotFound)
    }

    async fn add_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state.account_mut(id)?.roles.extend(roles.iter().cloned());
        Ok(())
    }

    async fn remove_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let account = state.account_mut(id)?;
        for role in roles {
            account.roles.remove(role);
        }
        Ok(())
    }

    async fn remove_account(&self, id: &AccountId) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        if state.accounts.remove(id).is_none() {
            return Err(AuthError::AccountNotFound);
        }
        state.identities.retain(|_, identity| identity.account_id != *id);
        state.credentials.retain(|credential| credential.owner_id != *id);
        state.reset_requests.retain(|request| request.account_id != *id);
        Ok(())
    }

    async fn block_account(&self, id: &AccountId) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state.account_mut(id)?.status = Status::Blocked;
        Ok(())
    }

    async fn unblock_account(&self, id: &AccountId) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state.account_mut(id)?.status = Status::Active;
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for InMemoryStore {
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError> {
        let mut state = self.state.write().await;
        if state
            .identities
            .values()
            .any(|existing| existing.identity == identity.identity)
        {
            return Err(AuthError::IdentityExists);
        }
        if !state.accounts.contains_key(&identity.account_id) {
            return Err(AuthError::AccountNotFound);
        }

        state.identities.insert(identity.id, identity.clone());
        Ok(state.resolve(&identity))
    }

    async fn get(&self, identity: &str) -> Result<Identity, AuthError> {
        let state = self.state.read().await;
        state
            .identities
            .values()
            .find(|existing| existing.identity == identity)
            .map(|found| state.resolve(found))
            .ok_or(AuthError::IdentityNotFound)
    }

    async fn get_by_id(&self, id: &IdentityId) -> Result<Identity, AuthError> {
        let state = self.state.read().await;
        state
            .identities
            .get(id)
            .map(|found| state.resolve(found))
            .ok_or(AuthError::IdentityNotFound)
    }

    async fn add_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state.identity_mut(id)?.roles.extend(roles.iter().cloned());
        Ok(())
    }

    async fn remove_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let identity = state.identity_mut(id)?;
        for role in roles {
            identity.roles.remove(role);
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialRepository for InMemoryStore {
    async fn create(&self, credential: Credential) -> Result<Credential, AuthError> {
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&credential.owner_id) {
            return Err(AuthError::CannotCreateCredential(
                "owner account does not exist".to_string(),
            ));
        }
        state.credentials.push(credential.clone());
        Ok(credential)
    }

    async fn get_last(
        &self,
        owner_id: &AccountId,
        kind: CredentialKind,
    ) -> Result<Credential, AuthError> {
        let state = self.state.read().await;
        state
            .credentials
            .iter()
            .rev()
            .find(|credential| credential.owner_id == *owner_id && credential.kind == kind)
            .cloned()
            .ok_or(AuthError::CredentialNotFound)
    }

    async fn remove_credentials(&self, owner_id: &AccountId) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state
            .credentials
            .retain(|credential| credential.owner_id != *owner_id);
        Ok(())
    }

    async fn replace_credentials(
        &self,
        owner_id: &AccountId,
        credential: Credential,
    ) -> Result<Credential, AuthError> {
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(owner_id) {
            return Err(AuthError::CannotCreateCredential(
                "owner account does not exist".to_string(),
            ));
        }
        state
            .credentials
            .retain(|existing| existing.owner_id != *owner_id);
        state.credentials.push(credential.clone());
        Ok(credential)
    }
}

#[async_trait]
impl TokenRepository for InMemoryStore {
    async fn create_access_token(&self, token: AccessToken) -> Result<AccessToken, AuthError> {
        let mut state = self.state.write().await;
        if state.access_tokens.contains_key(&token.hash) {
            return Err(AuthError::CannotCreateAccessToken(
                "duplicate token hash".to_string(),
            ));
        }
        state.access_tokens.insert(token.hash.clone(), token.clone());
        Ok(token)
    }

    async fn create_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, AuthError> {
        let mut state = self.state.write().await;
        if state.refresh_tokens.contains_key(&token.hash) {
            return Err(AuthError::CannotCreateRefreshToken(
                "duplicate token hash".to_string(),
            ));
        }
        state.refresh_tokens.insert(token.hash.clone(), token.clone());
        Ok(token)
    }

    async fn get_access_token(&self, hash: &str) -> Result<AccessToken, AuthError> {
        let state = self.state.read().await;
        state
            .access_tokens
            .get(hash)
            .cloned()
            .ok_or(AuthError::TokenNotExist)
    }

    async fn get_refresh_token(&self, hash: &str) -> Result<RefreshToken, AuthError> {
        let state = self.state.read().await;
        state
            .refresh_tokens
            .get(hash)
            .cloned()
            .ok_or(AuthError::TokenNotExist)
    }

    async fn revoke_access_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let token = state
            .access_tokens
            .get_mut(hash)
            .ok_or(AuthError::TokenNotExist)?;
        revoke(&mut token.revoked_at, at);
        Ok(())
    }

    async fn revoke_refresh_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let token = state
            .refresh_tokens
            .get_mut(hash)
            .ok_or(AuthError::TokenNotExist)?;
        revoke(&mut token.revoked_at, at);
        Ok(())
    }

    async fn revoke_session_tokens(
        &self,
        session_id: &SessionId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state
            .access_tokens
            .values_mut()
            .filter(|token| token.session_id == *session_id)
            .for_each(|token| revoke(&mut token.revoked_at, at));
        state
            .refresh_tokens
            .values_mut()
            .filter(|token| token.session_id == *session_id)
            .for_each(|token| revoke(&mut token.revoked_at, at));
        Ok(())
    }

    async fn revoke_session_access_tokens(
        &self,
        session_id: &SessionId,
        at: DateTime<Utc>,
        except: Uuid,
    ) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state
            .access_tokens
            .values_mut()
            .filter(|token| token.session_id == *session_id && token.id != except)
            .for_each(|token| revoke(&mut token.revoked_at, at));
        Ok(())
    }

    async fn revoke_user_tokens(
        &self,
        account_id: &AccountId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state
            .access_tokens
            .values_mut()
            .filter(|token| token.account_id == *account_id)
            .for_each(|token| revoke(&mut token.revoked_at, at));
        state
            .refresh_tokens
            .values_mut()
            .filter(|token| token.account_id == *account_id)
            .for_each(|token| revoke(&mut token.revoked_at, at));
        Ok(())
    }

    async fn use_refresh_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AuthError> {
        let mut state = self.state.write().await;
        let token = state
            .refresh_tokens
            .values_mut()
            .find(|token| token.id == id)
            .ok_or(AuthError::TokenNotExist)?;
        if token.used_at.is_some() {
            return Ok(false);
        }
        token.used_at = Some(at);
        revoke(&mut token.revoked_at, at);
        Ok(true)
    }
}

#[async_trait]
impl ResetPasswordRequestRepository for InMemoryStore {
    async fn get_active_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ResetPasswordRequest, AuthError> {
        let state = self.state.read().await;
        state
            .reset_requests
            .iter()
            .find(|request| {
                request.account_id == *account_id
                    && request.used_at.is_none()
                    && request.expired_at.is_none()
            })
            .cloned()
            .ok_or(AuthError::ResetPasswordRequestNotFound)
    }

    async fn expire_request(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let request = state
            .reset_requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or(AuthError::ResetPasswordRequestNotFound)?;
        if request.expired_at.is_none() {
            request.expired_at = Some(at);
        }
        Ok(())
    }

    async fn create_reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<ResetPasswordRequest, AuthError> {
        let mut state = self.state.write().await;
        if state.reset_requests.iter().any(|existing| {
            existing.account_id == request.account_id
                && existing.used_at.is_none()
                && existing.expired_at.is_none()
        }) {
            return Err(AuthError::ResetPasswordRequestExists);
        }
        state.reset_requests.push(request.clone());
        Ok(request)
    }

    async fn update_last_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let request = state
            .reset_requests
            .iter_mut()
            .find(|request| request.id == id)
            .ok_or(AuthError::ResetPasswordRequestNotFound)?;
        request.last_sent_at = Some(at);
        Ok(())
    }

    async fn get_reset_password_by_token(
        &self,
        token: &str,
    ) -> Result<ResetPasswordRequest, AuthError> {
        let state = self.state.read().await;
        state
            .reset_requests
            .iter()
            .find(|request| request.token == token)
            .cloned()
            .ok_or(AuthError::ResetPasswordTokenNotFound)
    }

    async fn use_reset_password(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let request = state
            .reset_requests
            .iter_mut()
            .find(|request| request.id == id && request.used_at.is_none())
            .ok_or(AuthError::ResetPasswordTokenNotFound)?;
        request.used_at = Some(at);
        Ok(())
    }
}
