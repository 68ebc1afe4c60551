use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::ports::IdentityRepository;
use crate::domain::performer::Performer;
use crate::domain::time::saturating_add;
use crate::domain::time::Clock;
use crate::domain::token::models::AccessToken;
use crate::domain::token::models::RefreshToken;
use crate::domain::token::models::SessionId;
use crate::domain::token::ports::TokenRepository;
use crate::domain::token::ports::TokenServicePort;

/// Lifetimes applied to newly minted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(1),
            refresh: Duration::hours(720),
        }
    }
}

/// Issues, validates, rotates and revokes opaque access/refresh token pairs.
///
/// Only hashes are persisted. Expiry is evaluated lazily against the clock.
pub struct OpaqueTokenAuthenticator<IR, TR>
where
    IR: IdentityRepository,
    TR: TokenRepository,
{
    identities: Arc<IR>,
    tokens: Arc<TR>,
    hasher: Arc<dyn auth::TokenHasher>,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
}

impl<IR, TR> OpaqueTokenAuthenticator<IR, TR>
where
    IR: IdentityRepository,
    TR: TokenRepository,
{
    pub fn new(
        identities: Arc<IR>,
        tokens: Arc<TR>,
        hasher: Arc<dyn auth::TokenHasher>,
        clock: Arc<dyn Clock>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            identities,
            tokens,
            hasher,
            clock,
            lifetimes,
        }
    }

    fn hash_presented(&self, raw: &str) -> Result<String, AuthError> {
        if !auth::is_well_formed(raw) {
            return Err(AuthError::InvalidToken);
        }
        Ok(self.hasher.hash(raw))
    }

    /// Identity whose roles get snapshotted into a new access token.
    async fn active_identity(&self, id: &IdentityId) -> Result<Identity, AuthError> {
        let identity = self.identities.get_by_id(id).await?;
        if identity.is_blocked() {
            return Err(AuthError::IdentityIsBlocked);
        }
        Ok(identity)
    }

    async fn usable_refresh_token(&self, raw: &str) -> Result<RefreshToken, AuthError> {
        let hash = self.hash_presented(raw)?;
        let token = self.tokens.get_refresh_token(&hash).await?;
        token.ensure_usable(self.clock.now())?;
        Ok(token)
    }

    async fn mint_access_token(
        &self,
        identity: &Identity,
        session_id: SessionId,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AuthError> {
        let raw = auth::generate_secret();
        let token = AccessToken {
            id: Uuid::new_v4(),
            hash: self.hasher.hash(raw.expose_secret()),
            identity_id: identity.id,
            account_id: identity.account_id,
            session_id,
            roles: identity.roles.clone(),
            data,
            revoked_at: None,
            expires_at: saturating_add(now, self.lifetimes.access),
            created_at: now,
            raw: None,
        };

        let mut stored = self
            .tokens
            .create_access_token(token)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session_id, error = %e, "Failed to store access token");
                match e {
                    AuthError::CannotCreateAccessToken(_) => e,
                    other => AuthError::CannotCreateAccessToken(other.to_string()),
                }
            })?;
        stored.raw = Some(raw);
        Ok(stored)
    }

    async fn mint_refresh_token(
        &self,
        identity: &Identity,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError> {
        let raw = auth::generate_secret();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            hash: self.hasher.hash(raw.expose_secret()),
            identity_id: identity.id,
            account_id: identity.account_id,
            session_id,
            revoked_at: None,
            used_at: None,
            expires_at: saturating_add(now, self.lifetimes.refresh),
            created_at: now,
            raw: None,
        };

        let mut stored = self
            .tokens
            .create_refresh_token(token)
            .await
            .map_err(|e| {
                tracing::error!(session_id = %session_id, error = %e, "Failed to store refresh token");
                match e {
                    AuthError::CannotCreateRefreshToken(_) => e,
                    other => AuthError::CannotCreateRefreshToken(other.to_string()),
                }
            })?;
        stored.raw = Some(raw);
        Ok(stored)
    }

    async fn revoke_reused_session(&self, token: &RefreshToken) -> AuthError {
        tracing::warn!(
            session_id = %token.session_id,
            account_id = %token.account_id,
            "Consumed refresh token presented again, revoking session"
        );
        match self
            .tokens
            .revoke_session_tokens(&token.session_id, self.clock.now())
            .await
        {
            Ok(()) => AuthError::TokenIsRevoked,
            Err(e) => e,
        }
    }
}

#[async_trait]
impl<IR, TR> TokenServicePort for OpaqueTokenAuthenticator<IR, TR>
where
    IR: IdentityRepository,
    TR: TokenRepository,
{
    async fn issue_tokens(
        &self,
        identity_id: &IdentityId,
        data: serde_json::Value,
    ) -> Result<(AccessToken, RefreshToken), AuthError> {
        let identity = self.active_identity(identity_id).await?;
        let now = self.clock.now();
        let session_id = SessionId::new();

        let access_token = self
            .mint_access_token(&identity, session_id, data, now)
            .await?;
        let refresh_token = self.mint_refresh_token(&identity, session_id, now).await?;

        tracing::info!(
            session_id = %session_id,
            account_id = %identity.account_id,
            identity_id = %identity.id,
            "Session started"
        );

        Ok((access_token, refresh_token))
    }

    async fn authenticate(&self, raw_access_token: &str) -> Result<Performer, AuthError> {
        let hash = self.hash_presented(raw_access_token)?;
        let token = self.tokens.get_access_token(&hash).await?;
        token.ensure_usable(self.clock.now())?;
        Ok(token.performer())
    }

    async fn issue_new_access_token(
        &self,
        raw_refresh_token: &str,
        data: serde_json::Value,
    ) -> Result<AccessToken, AuthError> {
        let refresh_token = self.usable_refresh_token(raw_refresh_token).await?;
        let identity = self.active_identity(&refresh_token.identity_id).await?;

        self.mint_access_token(&identity, refresh_token.session_id, data, self.clock.now())
            .await
    }

    async fn refresh_access_token(
        &self,
        raw_refresh_token: &str,
        data: serde_json::Value,
        grace_period: Duration,
    ) -> Result<AccessToken, AuthError> {
        let refresh_token = self.usable_refresh_token(raw_refresh_token).await?;
        let identity = self.active_identity(&refresh_token.identity_id).await?;

        let now = self.clock.now();
        let access_token = self
            .mint_access_token(&identity, refresh_token.session_id, data, now)
            .await?;

        let revoke_at = saturating_add(now, grace_period.max(Duration::zero()));
        self.tokens
            .revoke_session_access_tokens(&refresh_token.session_id, revoke_at, access_token.id)
            .await?;

        tracing::debug!(
            session_id = %refresh_token.session_id,
            revoke_at = %revoke_at,
            "Access token refreshed"
        );

        Ok(access_token)
    }

    async fn rotate_tokens(
        &self,
        raw_refresh_token: &str,
        data: serde_json::Value,
    ) -> Result<(AccessToken, RefreshToken), AuthError> {
        let hash = self.hash_presented(raw_refresh_token)?;
        let refresh_token = self.tokens.get_refresh_token(&hash).await?;
        if refresh_token.is_used() {
            return Err(self.revoke_reused_session(&refresh_token).await);
        }

        let now = self.clock.now();
        refresh_token.ensure_usable(now)?;
        if !self.tokens.use_refresh_token(refresh_token.id, now).await? {
            return Err(self.revoke_reused_session(&refresh_token).await);
        }

        let identity = self.active_identity(&refresh_token.identity_id).await?;
        let session_id = refresh_token.session_id;
        let access_token = self
            .mint_access_token(&identity, session_id, data, now)
            .await?;
        let new_refresh_token = self.mint_refresh_token(&identity, session_id, now).await?;

        self.tokens
            .revoke_session_access_tokens(&session_id, now, access_token.id)
            .await?;

        tracing::debug!(session_id = %session_id, "Token pair rotated");

        Ok((access_token, new_refresh_token))
    }

    async fn revoke_access_token(&self, raw_access_token: &str) -> Result<(), AuthError> {
        let hash = self.hash_presented(raw_access_token)?;
        self.tokens
            .revoke_access_token(&hash, self.clock.now())
            .await
    }

    async fn revoke_refresh_token(&self, raw_refresh_token: &str) -> Result<(), AuthError> {
        let hash = self.hash_presented(raw_refresh_token)?;
        self.tokens
            .revoke_refresh_token(&hash, self.clock.now())
            .await
    }

    async fn revoke_session_tokens(&self, session_id: &SessionId) -> Result<(), AuthError> {
        self.tokens
            .revoke_session_tokens(session_id, self.clock.now())
            .await?;
        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    async fn revoke_user_tokens(&self, account_id: &AccountId) -> Result<(), AuthError> {
        self.tokens
            .revoke_user_tokens(account_id, self.clock.now())
            .await?;
        tracing::info!(account_id = %account_id, "All sessions of account revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use secrecy::ExposeSecret;

    use super::*;
    use crate::domain::account::models::Status;
    use crate::domain::identity::models::IdentityKind;
    use crate::domain::testing::MockIdentityRepo;
    use crate::domain::testing::MockTokenRepo;
    use crate::domain::time::ManualClock;

    fn identity(status: Status) -> Identity {
        let mut identity = Identity::new(
            AccountId::new(),
            "alice@example.com",
            IdentityKind::Email,
            serde_json::json!({}),
            Utc::now(),
        )
        .unwrap();
        identity.status = status;
        identity.roles = BTreeSet::from(["admin".to_string()]);
        identity
    }

    fn service(
        identities: MockIdentityRepo,
        tokens: MockTokenRepo,
        clock: Arc<ManualClock>,
    ) -> OpaqueTokenAuthenticator<MockIdentityRepo, MockTokenRepo> {
        OpaqueTokenAuthenticator::new(
            Arc::new(identities),
            Arc::new(tokens),
            Arc::new(auth::Sha256TokenHasher::new("pepper").unwrap()),
            clock,
            TokenLifetimes::default(),
        )
    }

    fn refresh_token(identity: &Identity, now: DateTime<Utc>) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            hash: "stored".to_string(),
            identity_id: identity.id,
            account_id: identity.account_id,
            session_id: SessionId::new(),
            revoked_at: None,
            used_at: None,
            expires_at: now + Duration::hours(720),
            created_at: now,
            raw: None,
        }
    }

    const RAW: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[tokio::test]
    async fn test_issue_tokens_persists_hashes_only() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let stored = identity(Status::Active);
        let account_id = stored.account_id;

        let mut identities = MockIdentityRepo::new();
        let mut tokens = MockTokenRepo::new();
        identities
            .expect_get_by_id()
            .returning(move |_| Ok(stored.clone()));
        tokens
            .expect_create_access_token()
            .withf(move |token| {
                token.raw.is_none()
                    && token.hash.len() == 64
                    && token.expires_at == now + Duration::hours(1)
                    && token.roles.contains("admin")
            })
            .times(1)
            .returning(|token| Ok(token));
        tokens
            .expect_create_refresh_token()
            .withf(move |token| token.raw.is_none() && token.expires_at == now + Duration::hours(720))
            .times(1)
            .returning(|token| Ok(token));

        let service = service(identities, tokens, clock);
        let (access, refresh) = service
            .issue_tokens(&IdentityId::new(), serde_json::json!({"ip": "127.0.0.1"}))
            .await
            .unwrap();

        assert_eq!(access.session_id, refresh.session_id);
        assert_eq!(access.account_id, account_id);
        assert_eq!(access.data["ip"], "127.0.0.1");

        let raw_access = access.raw.as_ref().unwrap().expose_secret().to_string();
        let raw_refresh = refresh.raw.as_ref().unwrap().expose_secret().to_string();
        assert_ne!(raw_access, raw_refresh);
        assert_ne!(access.hash, raw_access);
        assert_eq!(access.hash, service.hasher.hash(&raw_access));
    }

    #[tokio::test]
    async fn test_issue_tokens_distinguishes_write_failures() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let stored = identity(Status::Active);

        let mut identities = MockIdentityRepo::new();
        let mut tokens = MockTokenRepo::new();
        identities
            .expect_get_by_id()
            .returning(move |_| Ok(stored.clone()));
        tokens
            .expect_create_access_token()
            .returning(|token| Ok(token));
        tokens
            .expect_create_refresh_token()
            .returning(|_| Err(AuthError::DatabaseError("connection reset".to_string())));

        let service = service(identities, tokens, clock);
        let result = service
            .issue_tokens(&IdentityId::new(), serde_json::Value::Null)
            .await;

        assert!(matches!(
            result,
            Err(AuthError::CannotCreateRefreshToken(msg)) if msg.contains("connection reset")
        ));
    }

    #[tokio::test]
    async fn test_issue_tokens_for_blocked_identity() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut identities = MockIdentityRepo::new();
        let mut tokens = MockTokenRepo::new();
        identities
            .expect_get_by_id()
            .returning(|_| Ok(identity(Status::Blocked)));
        tokens.expect_create_access_token().times(0);

        let service = service(identities, tokens, clock);
        assert!(matches!(
            service
                .issue_tokens(&IdentityId::new(), serde_json::Value::Null)
                .await,
            Err(AuthError::IdentityIsBlocked)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_malformed_input_without_lookup() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut tokens = MockTokenRepo::new();
        tokens.expect_get_access_token().times(0);

        let service = service(MockIdentityRepo::new(), tokens, clock);
        assert_eq!(
            service.authenticate("Bearer abc").await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut tokens = MockTokenRepo::new();
        tokens
            .expect_get_access_token()
            .returning(|_| Err(AuthError::TokenNotExist));

        let service = service(MockIdentityRepo::new(), tokens, clock);
        assert_eq!(
            service.authenticate(RAW).await.unwrap_err(),
            AuthError::TokenNotExist
        );
    }

    #[tokio::test]
    async fn test_refresh_with_expired_refresh_token() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let owner = identity(Status::Active);
        let mut expired = refresh_token(&owner, now);
        expired.expires_at = now - Duration::seconds(1);

        let mut tokens = MockTokenRepo::new();
        tokens
            .expect_get_refresh_token()
            .returning(move |_| Ok(expired.clone()));
        tokens.expect_create_access_token().times(0);

        let service = service(MockIdentityRepo::new(), tokens, clock);
        assert!(matches!(
            service
                .issue_new_access_token(RAW, serde_json::Value::Null)
                .await,
            Err(AuthError::TokenIsExpired)
        ));
    }

    #[tokio::test]
    async fn test_refresh_access_token_schedules_revocation_after_grace() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let owner = identity(Status::Active);
        let token = refresh_token(&owner, now);
        let session_id = token.session_id;

        let mut identities = MockIdentityRepo::new();
        let mut tokens = MockTokenRepo::new();
        identities
            .expect_get_by_id()
            .returning(move |_| Ok(owner.clone()));
        tokens
            .expect_get_refresh_token()
            .returning(move |_| Ok(token.clone()));
        tokens
            .expect_create_access_token()
            .returning(|token| Ok(token));
        tokens
            .expect_revoke_session_access_tokens()
            .withf(move |session, at, _| {
                *session == session_id && *at == now + Duration::seconds(30)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(identities, tokens, clock);
        let access = service
            .refresh_access_token(RAW, serde_json::Value::Null, Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(access.session_id, session_id);
    }

    #[tokio::test]
    async fn test_refresh_access_token_negative_grace_revokes_now() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let owner = identity(Status::Active);
        let token = refresh_token(&owner, now);

        let mut identities = MockIdentityRepo::new();
        let mut tokens = MockTokenRepo::new();
        identities
            .expect_get_by_id()
            .returning(move |_| Ok(owner.clone()));
        tokens
            .expect_get_refresh_token()
            .returning(move |_| Ok(token.clone()));
        tokens
            .expect_create_access_token()
            .returning(|token| Ok(token));
        tokens
            .expect_revoke_session_access_tokens()
            .withf(move |_, at, _| *at == now)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(identities, tokens, clock);
        service
            .refresh_access_token(RAW, serde_json::Value::Null, Duration::seconds(-1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rotate_consumed_refresh_token_revokes_session() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let owner = identity(Status::Active);
        let mut consumed = refresh_token(&owner, now);
        consumed.used_at = Some(now);
        let session_id = consumed.session_id;

        let mut tokens = MockTokenRepo::new();
        tokens
            .expect_get_refresh_token()
            .returning(move |_| Ok(consumed.clone()));
        tokens.expect_use_refresh_token().times(0);
        tokens
            .expect_revoke_session_tokens()
            .withf(move |session, _| *session == session_id)
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(MockIdentityRepo::new(), tokens, clock);
        assert!(matches!(
            service.rotate_tokens(RAW, serde_json::Value::Null).await,
            Err(AuthError::TokenIsRevoked)
        ));
    }

    #[tokio::test]
    async fn test_rotate_revoked_and_consumed_refresh_token_still_revokes_session() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let owner = identity(Status::Active);
        let mut consumed = refresh_token(&owner, now);
        consumed.used_at = Some(now);
        consumed.revoked_at = Some(now);

        let mut tokens = MockTokenRepo::new();
        tokens
            .expect_get_refresh_token()
            .returning(move |_| Ok(consumed.clone()));
        tokens
            .expect_revoke_session_tokens()
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(MockIdentityRepo::new(), tokens, clock);
        assert!(matches!(
            service.rotate_tokens(RAW, serde_json::Value::Null).await,
            Err(AuthError::TokenIsRevoked)
        ));
    }

    #[tokio::test]
    async fn test_refresh_with_unbounded_grace_schedules_at_the_end_of_time() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let owner = identity(Status::Active);
        let token = refresh_token(&owner, now);

        let mut identities = MockIdentityRepo::new();
        let mut tokens = MockTokenRepo::new();
        identities
            .expect_get_by_id()
            .returning(move |_| Ok(owner.clone()));
        tokens
            .expect_get_refresh_token()
            .returning(move |_| Ok(token.clone()));
        tokens
            .expect_create_access_token()
            .returning(|token| Ok(token));
        tokens
            .expect_revoke_session_access_tokens()
            .withf(|_, at, _| *at == DateTime::<Utc>::MAX_UTC)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(identities, tokens, clock);
        service
            .refresh_access_token(RAW, serde_json::Value::Null, Duration::MAX)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_huge_lifetimes_saturate_expiry() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let stored = identity(Status::Active);

        let mut identities = MockIdentityRepo::new();
        let mut tokens = MockTokenRepo::new();
        identities
            .expect_get_by_id()
            .returning(move |_| Ok(stored.clone()));
        tokens
            .expect_create_access_token()
            .returning(|token| Ok(token));
        tokens
            .expect_create_refresh_token()
            .returning(|token| Ok(token));

        let service = OpaqueTokenAuthenticator::new(
            Arc::new(identities),
            Arc::new(tokens),
            Arc::new(auth::Sha256TokenHasher::new("pepper").unwrap()),
            clock,
            TokenLifetimes {
                access: Duration::MAX,
                refresh: Duration::MAX,
            },
        );
        let (access, refresh) = service
            .issue_tokens(&IdentityId::new(), serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(access.expires_at, DateTime::<Utc>::MAX_UTC);
        assert_eq!(refresh.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_rotate_lost_race_revokes_session() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();
        let owner = identity(Status::Active);
        let token = refresh_token(&owner, now);

        let mut tokens = MockTokenRepo::new();
        tokens
            .expect_get_refresh_token()
            .returning(move |_| Ok(token.clone()));
        tokens
            .expect_use_refresh_token()
            .times(1)
            .returning(|_, _| Ok(false));
        tokens
            .expect_revoke_session_tokens()
            .times(1)
            .returning(|_, _| Ok(()));
        tokens.expect_create_access_token().times(0);

        let service = service(MockIdentityRepo::new(), tokens, clock);
        assert!(matches!(
            service.rotate_tokens(RAW, serde_json::Value::Null).await,
            Err(AuthError::TokenIsRevoked)
        ));
    }

    #[tokio::test]
    async fn test_revoke_access_token_hashes_input() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let expected = auth::Sha256TokenHasher::new("pepper").unwrap();
        let expected_hash = auth::TokenHasher::hash(&expected, RAW);

        let mut tokens = MockTokenRepo::new();
        tokens
            .expect_revoke_access_token()
            .withf(move |hash, _| hash == expected_hash)
            .times(2)
            .returning(|_, _| Ok(()));

        let service = service(MockIdentityRepo::new(), tokens, clock);
        service.revoke_access_token(RAW).await.unwrap();
        service.revoke_access_token(RAW).await.unwrap();
    }
}
