use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::reset_password::models::ResetPasswordRequest;

/// Port for the password-reset workflow.
#[async_trait]
pub trait ResetPasswordServicePort: Send + Sync + 'static {
    /// Create, resend or silently keep the reset request of the account behind `email`.
    ///
    /// # Returns
    /// The current active request; inside the cooldown window this is the
    /// existing request and no email is sent
    ///
    /// # Errors
    /// * `IdentityNotFound` - Neither a local identity nor a verified email matches
    /// * `IdentityIsBlocked` - Identity is blocked
    /// * `MailDelivery` - Email could not be sent
    async fn request(&self, email: &str) -> Result<ResetPasswordRequest, AuthError>;

    /// Set a new password using a reset token.
    ///
    /// # Errors
    /// * `ResetPasswordTokenNotFound` - Unknown or already used token
    /// * `ResetPasswordRequestExpired` - Request outlived its life
    /// * `CannotHashPassword` - Password hashing failed
    async fn confirm(&self, token: &str, new_password: &str) -> Result<(), AuthError>;
}

/// Persistence operations for reset requests.
///
/// "Active" at the store level means neither used nor explicitly expired.
/// The store guarantees at most one active request per account.
#[async_trait]
pub trait ResetPasswordRequestRepository: Send + Sync + 'static {
    /// # Errors
    /// * `ResetPasswordRequestNotFound` - Account has no active request
    async fn get_active_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ResetPasswordRequest, AuthError>;

    async fn expire_request(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// # Errors
    /// * `ResetPasswordRequestExists` - Account already has an active request
    async fn create_reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<ResetPasswordRequest, AuthError>;

    async fn update_last_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// # Errors
    /// * `ResetPasswordTokenNotFound` - No request with this token
    async fn get_reset_password_by_token(
        &self,
        token: &str,
    ) -> Result<ResetPasswordRequest, AuthError>;

    /// Mark the request used, only if it is not used yet.
    ///
    /// # Errors
    /// * `ResetPasswordTokenNotFound` - Request missing or already used
    async fn use_reset_password(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError>;
}

/// Outbound email delivery.
#[async_trait]
pub trait MailSender: Send + Sync + 'static {
    /// # Errors
    /// * `MailDelivery` - Message could not be handed to the transport
    async fn send_reset_password_email(&self, to: &str, link: &str) -> Result<(), AuthError>;
}
