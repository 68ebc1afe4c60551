use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::identity::ports::VerifiedEmailChecker;
use crate::outbound::repositories::database_error;

/// Checker for deployments without external identity providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVerifiedEmails;

#[async_trait]
impl VerifiedEmailChecker for NoVerifiedEmails {
    async fn find_account_id_by_verified_email(
        &self,
        _email: &str,
    ) -> Result<AccountId, AuthError> {
        Err(AuthError::IdentityNotFound)
    }
}

/// Looks for a non-email identity (for example a Google login) whose
/// provider metadata reports the address as verified.
pub struct PostgresVerifiedEmailChecker {
    pool: PgPool,
}

impl PostgresVerifiedEmailChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerifiedEmailChecker for PostgresVerifiedEmailChecker {
    async fn find_account_id_by_verified_email(
        &self,
        email: &str,
    ) -> Result<AccountId, AuthError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT account_id
            FROM identities
            WHERE kind <> 'email'
              AND lower(metadata ->> 'email') = lower($1)
              AND (metadata ->> 'email_verified')::boolean IS TRUE
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(|(account_id,)| AccountId(account_id))
            .ok_or(AuthError::IdentityNotFound)
    }
}
