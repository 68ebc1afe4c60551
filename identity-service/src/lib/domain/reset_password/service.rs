use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use secrecy::ExposeSecret;

use crate::domain::account::models::AccountId;
use crate::domain::credential::models::Credential;
use crate::domain::credential::ports::CredentialRepository;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityKind;
use crate::domain::identity::ports::IdentityRepository;
use crate::domain::identity::ports::VerifiedEmailChecker;
use crate::domain::reset_password::models::ResetPasswordPolicy;
use crate::domain::reset_password::models::ResetPasswordRequest;
use crate::domain::reset_password::models::ResetPasswordStatus;
use crate::domain::reset_password::ports::MailSender;
use crate::domain::reset_password::ports::ResetPasswordRequestRepository;
use crate::domain::reset_password::ports::ResetPasswordServicePort;
use crate::domain::time::Clock;
use crate::domain::token::ports::TokenRepository;

/// Placeholder replaced by the raw token in the emailed link.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

/// Collaborators that live outside the store.
pub struct ResetPasswordCollaborators {
    pub mail_sender: Arc<dyn MailSender>,
    pub verified_emails: Arc<dyn VerifiedEmailChecker>,
    pub password_hasher: auth::PasswordHasher,
    pub clock: Arc<dyn Clock>,
}

pub struct ResetPasswordService<IR, CR, TR, RR>
where
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
    RR: ResetPasswordRequestRepository,
{
    identities: Arc<IR>,
    credentials: Arc<CR>,
    tokens: Arc<TR>,
    requests: Arc<RR>,
    mail_sender: Arc<dyn MailSender>,
    verified_emails: Arc<dyn VerifiedEmailChecker>,
    password_hasher: auth::PasswordHasher,
    clock: Arc<dyn Clock>,
    policy: ResetPasswordPolicy,
    link_template: String,
}

impl<IR, CR, TR, RR> ResetPasswordService<IR, CR, TR, RR>
where
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
    RR: ResetPasswordRequestRepository,
{
    pub fn new(
        identities: Arc<IR>,
        credentials: Arc<CR>,
        tokens: Arc<TR>,
        requests: Arc<RR>,
        collaborators: ResetPasswordCollaborators,
        policy: ResetPasswordPolicy,
        link_template: impl Into<String>,
    ) -> Self {
        Self {
            identities,
            credentials,
            tokens,
            requests,
            mail_sender: collaborators.mail_sender,
            verified_emails: collaborators.verified_emails,
            password_hasher: collaborators.password_hasher,
            clock: collaborators.clock,
            policy,
            link_template: link_template.into(),
        }
    }

    fn link(&self, token: &str) -> String {
        self.link_template.replace(TOKEN_PLACEHOLDER, token)
    }

    /// Find the identity behind `email`, falling back to an account that
    /// verified the address through another provider.
    async fn resolve_identity(&self, email: &str) -> Result<Identity, AuthError> {
        match self.identities.get(email).await {
            Err(AuthError::IdentityNotFound) => {}
            other => return other,
        }

        let account_id = self
            .verified_emails
            .find_account_id_by_verified_email(email)
            .await?;
        let identity = Identity::new(
            account_id,
            email,
            IdentityKind::Email,
            serde_json::json!({}),
            self.clock.now(),
        )?;

        match self.identities.create(identity).await {
            Ok(created) => {
                tracing::info!(
                    account_id = %account_id,
                    identity_id = %created.id,
                    "Email identity created from verified email"
                );
                Ok(created)
            }
            // Lost a race with a concurrent request for the same address.
            Err(AuthError::IdentityExists) => self.identities.get(email).await,
            Err(e) => Err(e),
        }
    }

    async fn send(
        &self,
        email: &str,
        request: &mut ResetPasswordRequest,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.mail_sender
            .send_reset_password_email(email, &self.link(&request.token))
            .await?;
        self.requests.update_last_sent(request.id, now).await?;
        request.last_sent_at = Some(now);
        Ok(())
    }

    async fn create_and_send(
        &self,
        email: &str,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<ResetPasswordRequest, AuthError> {
        let token = auth::generate_secret();
        let request = ResetPasswordRequest::new(account_id, token.expose_secret().to_string(), now);

        let mut request = match self.requests.create_reset_password(request).await {
            Ok(request) => request,
            Err(AuthError::ResetPasswordRequestExists) => {
                tracing::debug!(
                    account_id = %account_id,
                    "Concurrent reset request won, returning it"
                );
                return self.requests.get_active_request(&account_id).await;
            }
            Err(e) => return Err(e),
        };

        self.send(email, &mut request, now).await?;
        tracing::info!(account_id = %account_id, "Reset password request created");
        Ok(request)
    }
}

#[async_trait]
impl<IR, CR, TR, RR> ResetPasswordServicePort for ResetPasswordService<IR, CR, TR, RR>
where
    IR: IdentityRepository,
    CR: CredentialRepository,
    TR: TokenRepository,
    RR: ResetPasswordRequestRepository,
{
    async fn request(&self, email: &str) -> Result<ResetPasswordRequest, AuthError> {
        let identity = self.resolve_identity(email).await?;
        if identity.is_blocked() {
            return Err(AuthError::IdentityIsBlocked);
        }

        let now = self.clock.now();
        let account_id = identity.account_id;

        let mut active = match self.requests.get_active_request(&account_id).await {
            Ok(active) => active,
            Err(AuthError::ResetPasswordRequestNotFound) => {
                return self.create_and_send(email, account_id, now).await
            }
            Err(e) => return Err(e),
        };

        if !active.is_alive(now, &self.policy) {
            self.requests.expire_request(active.id, now).await?;
            tracing::debug!(account_id = %account_id, "Stale reset request expired");
            return self.create_and_send(email, account_id, now).await;
        }

        if active.can_be_resent(now, &self.policy) {
            self.send(email, &mut active, now).await?;
            tracing::info!(account_id = %account_id, "Reset password email resent");
        }

        Ok(active)
    }

    async fn confirm(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let request = self.requests.get_reset_password_by_token(token).await?;
        let now = self.clock.now();

        match request.status(now, &self.policy) {
            ResetPasswordStatus::Used => return Err(AuthError::ResetPasswordTokenNotFound),
            ResetPasswordStatus::Expired => {
                if request.expired_at.is_none() {
                    self.requests.expire_request(request.id, now).await?;
                }
                return Err(AuthError::ResetPasswordRequestExpired);
            }
            ResetPasswordStatus::Active => {}
        }

        let password_hash = self.password_hasher.hash(new_password)?;

        self.requests.use_reset_password(request.id, now).await?;
        self.credentials
            .replace_credentials(
                &request.account_id,
                Credential::password(request.account_id, password_hash, now),
            )
            .await?;
        self.tokens
            .revoke_user_tokens(&request.account_id, now)
            .await?;

        tracing::info!(account_id = %request.account_id, "Password reset confirmed");
        Ok(())
    }
}
