//! Mocks of every port, shared by the service unit tests.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use mockall::mock;
use uuid::Uuid;

use crate::domain::account::models::Account;
use crate::domain::account::models::AccountId;
use crate::domain::account::ports::AccountRepository;
use crate::domain::credential::models::Credential;
use crate::domain::credential::models::CredentialKind;
use crate::domain::credential::ports::CredentialRepository;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::ports::IdentityRepository;
use crate::domain::identity::ports::VerifiedEmailChecker;
use crate::domain::reset_password::models::ResetPasswordRequest;
use crate::domain::reset_password::ports::MailSender;
use crate::domain::reset_password::ports::ResetPasswordRequestRepository;
use crate::domain::token::models::AccessToken;
use crate::domain::token::models::RefreshToken;
use crate::domain::token::models::SessionId;
use crate::domain::token::ports::TokenRepository;

/// Argon2 with minimal cost, so tests stay fast.
pub fn cheap_password_hasher() -> auth::PasswordHasher {
    auth::PasswordHasher::with_params(1024, 1, 1).expect("valid Argon2 params")
}

mock! {
    pub AccountRepo {}

    #[async_trait]
    impl AccountRepository for AccountRepo {
        async fn create(&self, account: Account) -> Result<Account, AuthError>;
        async fn get(&self, id: &AccountId) -> Result<Account, AuthError>;
        async fn add_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError>;
        async fn remove_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError>;
        async fn remove_account(&self, id: &AccountId) -> Result<(), AuthError>;
        async fn block_account(&self, id: &AccountId) -> Result<(), AuthError>;
        async fn unblock_account(&self, id: &AccountId) -> Result<(), AuthError>;
    }
}

mock! {
    pub IdentityRepo {}

    #[async_trait]
    impl IdentityRepository for IdentityRepo {
        async fn create(&self, identity: Identity) -> Result<Identity, AuthError>;
        async fn get(&self, identity: &str) -> Result<Identity, AuthError>;
        async fn get_by_id(&self, id: &IdentityId) -> Result<Identity, AuthError>;
        async fn add_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError>;
        async fn remove_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError>;
    }
}

mock! {
    pub CredentialRepo {}

    #[async_trait]
    impl CredentialRepository for CredentialRepo {
        async fn create(&self, credential: Credential) -> Result<Credential, AuthError>;
        async fn get_last(&self, owner_id: &AccountId, kind: CredentialKind) -> Result<Credential, AuthError>;
        async fn remove_credentials(&self, owner_id: &AccountId) -> Result<(), AuthError>;
        async fn replace_credentials(&self, owner_id: &AccountId, credential: Credential) -> Result<Credential, AuthError>;
    }
}

mock! {
    pub TokenRepo {}

    #[async_trait]
    impl TokenRepository for TokenRepo {
        async fn create_access_token(&self, token: AccessToken) -> Result<AccessToken, AuthError>;
        async fn create_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, AuthError>;
        async fn get_access_token(&self, hash: &str) -> Result<AccessToken, AuthError>;
        async fn get_refresh_token(&self, hash: &str) -> Result<RefreshToken, AuthError>;
        async fn revoke_access_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError>;
        async fn revoke_refresh_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError>;
        async fn revoke_session_tokens(&self, session_id: &SessionId, at: DateTime<Utc>) -> Result<(), AuthError>;
        async fn revoke_session_access_tokens(&self, session_id: &SessionId, at: DateTime<Utc>, except: Uuid) -> Result<(), AuthError>;
        async fn revoke_user_tokens(&self, account_id: &AccountId, at: DateTime<Utc>) -> Result<(), AuthError>;
        async fn use_refresh_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AuthError>;
    }
}

mock! {
    pub ResetRequestRepo {}

    #[async_trait]
    impl ResetPasswordRequestRepository for ResetRequestRepo {
        async fn get_active_request(&self, account_id: &AccountId) -> Result<ResetPasswordRequest, AuthError>;
        async fn expire_request(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;
        async fn create_reset_password(&self, request: ResetPasswordRequest) -> Result<ResetPasswordRequest, AuthError>;
        async fn update_last_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;
        async fn get_reset_password_by_token(&self, token: &str) -> Result<ResetPasswordRequest, AuthError>;
        async fn use_reset_password(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;
    }
}

mock! {
    pub Mailer {}

    #[async_trait]
    impl MailSender for Mailer {
        async fn send_reset_password_email(&self, to: &str, link: &str) -> Result<(), AuthError>;
    }
}

mock! {
    pub VerifiedEmails {}

    #[async_trait]
    impl VerifiedEmailChecker for VerifiedEmails {
        async fn find_account_id_by_verified_email(&self, email: &str) -> Result<AccountId, AuthError>;
    }
}
