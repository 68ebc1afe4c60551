use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::IdentityId;
use crate::domain::performer::Performer;
use crate::domain::token::models::AccessToken;
use crate::domain::token::models::RefreshToken;
use crate::domain::token::models::SessionId;

/// Port for opaque bearer token operations.
///
/// Raw secrets are accepted as input and handed out exactly once, on the
/// tokens returned by the issuing calls.
#[async_trait]
pub trait TokenServicePort: Send + Sync + 'static {
    /// Start a new session for an identity.
    ///
    /// # Returns
    /// Access and refresh token, both with `raw` set
    ///
    /// # Errors
    /// * `IdentityNotFound` - Identity does not exist
    /// * `IdentityIsBlocked` - Identity is blocked
    /// * `CannotCreateAccessToken` - Access token write failed
    /// * `CannotCreateRefreshToken` - Refresh token write failed
    async fn issue_tokens(
        &self,
        identity_id: &IdentityId,
        data: serde_json::Value,
    ) -> Result<(AccessToken, RefreshToken), AuthError>;

    /// Restore the performer behind a raw access token.
    ///
    /// # Errors
    /// * `InvalidToken` - Input is not shaped like a token
    /// * `TokenNotExist` - No such token
    /// * `TokenIsRevoked` - Token revoked
    /// * `TokenIsExpired` - Token expired
    async fn authenticate(&self, raw_access_token: &str) -> Result<Performer, AuthError>;

    /// Mint an access token in the refresh token's session. The refresh
    /// token is not consumed.
    ///
    /// # Errors
    /// * `InvalidToken`, `TokenNotExist`, `TokenIsRevoked`, `TokenIsExpired` - Refresh token unusable
    /// * `CannotCreateAccessToken` - Access token write failed
    async fn issue_new_access_token(
        &self,
        raw_refresh_token: &str,
        data: serde_json::Value,
    ) -> Result<AccessToken, AuthError>;

    /// Like `issue_new_access_token`, and revoke the session's older access
    /// tokens once `grace_period` has elapsed (zero or negative: now).
    async fn refresh_access_token(
        &self,
        raw_refresh_token: &str,
        data: serde_json::Value,
        grace_period: Duration,
    ) -> Result<AccessToken, AuthError>;

    /// Consume the refresh token and mint a new pair in the same session.
    ///
    /// # Errors
    /// * `TokenIsRevoked` - Refresh token was already consumed; the whole
    ///   session is revoked as a reuse countermeasure
    async fn rotate_tokens(
        &self,
        raw_refresh_token: &str,
        data: serde_json::Value,
    ) -> Result<(AccessToken, RefreshToken), AuthError>;

    /// Idempotent.
    ///
    /// # Errors
    /// * `InvalidToken` - Input is not shaped like a token
    /// * `TokenNotExist` - No such token
    async fn revoke_access_token(&self, raw_access_token: &str) -> Result<(), AuthError>;

    /// Idempotent.
    ///
    /// # Errors
    /// * `InvalidToken` - Input is not shaped like a token
    /// * `TokenNotExist` - No such token
    async fn revoke_refresh_token(&self, raw_refresh_token: &str) -> Result<(), AuthError>;

    /// Log out one session.
    async fn revoke_session_tokens(&self, session_id: &SessionId) -> Result<(), AuthError>;

    /// Log out everywhere.
    async fn revoke_user_tokens(&self, account_id: &AccountId) -> Result<(), AuthError>;
}

/// Persistence operations for access and refresh tokens.
///
/// Tokens are looked up by hash only. Revocations take the time to record;
/// an existing earlier `revoked_at` is always kept, so repeating a
/// revocation is harmless and a scheduled one can only be brought forward.
#[async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    /// # Errors
    /// * `CannotCreateAccessToken` - Store rejected the write
    async fn create_access_token(&self, token: AccessToken) -> Result<AccessToken, AuthError>;

    /// # Errors
    /// * `CannotCreateRefreshToken` - Store rejected the write
    async fn create_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, AuthError>;

    /// # Errors
    /// * `TokenNotExist` - No token with this hash
    async fn get_access_token(&self, hash: &str) -> Result<AccessToken, AuthError>;

    /// # Errors
    /// * `TokenNotExist` - No token with this hash
    async fn get_refresh_token(&self, hash: &str) -> Result<RefreshToken, AuthError>;

    /// # Errors
    /// * `TokenNotExist` - No token with this hash
    async fn revoke_access_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// # Errors
    /// * `TokenNotExist` - No token with this hash
    async fn revoke_refresh_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Revoke every access token and every refresh token of a session.
    async fn revoke_session_tokens(
        &self,
        session_id: &SessionId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Revoke the session's access tokens other than `except` at time `at`.
    async fn revoke_session_access_tokens(
        &self,
        session_id: &SessionId,
        at: DateTime<Utc>,
        except: Uuid,
    ) -> Result<(), AuthError>;

    /// Revoke every access token and every refresh token of the account,
    /// across all of its sessions.
    async fn revoke_user_tokens(
        &self,
        account_id: &AccountId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Mark a refresh token consumed and revoke it at `at`, in one step.
    ///
    /// # Returns
    /// `false` when it had already been consumed by someone else
    async fn use_refresh_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AuthError>;
}
