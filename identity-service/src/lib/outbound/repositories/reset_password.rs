use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use super::is_unique_violation;
use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::reset_password::models::ResetPasswordRequest;
use crate::domain::reset_password::ports::ResetPasswordRequestRepository;

const SELECT_REQUEST: &str = r#"
    SELECT id, account_id, token, created_at, last_sent_at, used_at, expired_at
    FROM reset_password_requests
"#;

#[derive(sqlx::FromRow)]
struct ResetPasswordRow {
    id: Uuid,
    account_id: Uuid,
    token: String,
    created_at: DateTime<Utc>,
    last_sent_at: Option<DateTime<Utc>>,
    used_at: Option<DateTime<Utc>>,
    expired_at: Option<DateTime<Utc>>,
}

impl From<ResetPasswordRow> for ResetPasswordRequest {
    fn from(row: ResetPasswordRow) -> Self {
        ResetPasswordRequest {
            id: row.id,
            account_id: AccountId(row.account_id),
            token: row.token,
            created_at: row.created_at,
            last_sent_at: row.last_sent_at,
            used_at: row.used_at,
            expired_at: row.expired_at,
        }
    }
}

pub struct PostgresResetPasswordRequestRepository {
    pool: PgPool,
}

impl PostgresResetPasswordRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetPasswordRequestRepository for PostgresResetPasswordRequestRepository {
    async fn get_active_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ResetPasswordRequest, AuthError> {
        let row: Option<ResetPasswordRow> = sqlx::query_as(&format!(
            "{} WHERE account_id = $1 AND used_at IS NULL AND expired_at IS NULL",
            SELECT_REQUEST
        ))
        .bind(account_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(ResetPasswordRequest::from)
            .ok_or(AuthError::ResetPasswordRequestNotFound)
    }

    async fn expire_request(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE reset_password_requests SET expired_at = COALESCE(expired_at, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;
        Ok(())
    }

    async fn create_reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<ResetPasswordRequest, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO reset_password_requests
                (id, account_id, token, created_at, last_sent_at, used_at, expired_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(request.id)
        .bind(request.account_id.0)
        .bind(&request.token)
        .bind(request.created_at)
        .bind(request.last_sent_at)
        .bind(request.used_at)
        .bind(request.expired_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "reset_password_requests_active_key") {
                return AuthError::ResetPasswordRequestExists;
            }
            database_error(e)
        })?;

        Ok(request)
    }

    async fn update_last_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        let updated = sqlx::query("UPDATE reset_password_requests SET last_sent_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::ResetPasswordRequestNotFound);
        }
        Ok(())
    }

    async fn get_reset_password_by_token(
        &self,
        token: &str,
    ) -> Result<ResetPasswordRequest, AuthError> {
        let row: Option<ResetPasswordRow> =
            sqlx::query_as(&format!("{} WHERE token = $1", SELECT_REQUEST))
                .bind(token)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;

        row.map(ResetPasswordRequest::from)
            .ok_or(AuthError::ResetPasswordTokenNotFound)
    }

    async fn use_reset_password(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AuthError> {
        let updated = sqlx::query(
            "UPDATE reset_password_requests SET used_at = $2 WHERE id = $1 AND used_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::ResetPasswordTokenNotFound);
        }
        Ok(())
    }
}
