use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use crate::domain::account::models::AccountId;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::IdentityId;
use crate::domain::token::models::AccessToken;
use crate::domain::token::models::RefreshToken;
use crate::domain::token::models::SessionId;
use crate::domain::token::ports::TokenRepository;

// An earlier revocation time always survives a later one.
const REVOKE_AT: &str = "revoked_at = LEAST(COALESCE(revoked_at, $2), $2)";

#[derive(sqlx::FromRow)]
struct AccessTokenRow {
    id: Uuid,
    hash: String,
    identity_id: Uuid,
    account_id: Uuid,
    session_id: Uuid,
    roles: Vec<String>,
    data: serde_json::Value,
    revoked_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<AccessTokenRow> for AccessToken {
    fn from(row: AccessTokenRow) -> Self {
        AccessToken {
            id: row.id,
            hash: row.hash,
            identity_id: IdentityId(row.identity_id),
            account_id: AccountId(row.account_id),
            session_id: SessionId(row.session_id),
            roles: row.roles.into_iter().collect(),
            data: row.data,
            revoked_at: row.revoked_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            raw: None,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    hash: String,
    identity_id: Uuid,
    account_id: Uuid,
    session_id: Uuid,
    revoked_at: Option<DateTime<Utc>>,
    used_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            hash: row.hash,
            identity_id: IdentityId(row.identity_id),
            account_id: AccountId(row.account_id),
            session_id: SessionId(row.session_id),
            revoked_at: row.revoked_at,
            used_at: row.used_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            raw: None,
        }
    }
}

pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn revoke_by_hash(
        &self,
        table: &str,
        hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let sql = format!("UPDATE {} SET {} WHERE hash = $1", table, REVOKE_AT);
        let updated = sqlx::query(&sql)
            .bind(hash)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::TokenNotExist);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn create_access_token(&self, token: AccessToken) -> Result<AccessToken, AuthError> {
        let roles: Vec<String> = token.roles.iter().cloned().collect();

        sqlx::query(
            r#"
            INSERT INTO access_tokens
                (id, hash, identity_id, account_id, session_id, roles, data, revoked_at, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(token.id)
        .bind(&token.hash)
        .bind(token.identity_id.0)
        .bind(token.account_id.0)
        .bind(token.session_id.0)
        .bind(&roles)
        .bind(&token.data)
        .bind(token.revoked_at)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::CannotCreateAccessToken(e.to_string()))?;

        Ok(token)
    }

    async fn create_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, hash, identity_id, account_id, session_id, revoked_at, used_at, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(token.id)
        .bind(&token.hash)
        .bind(token.identity_id.0)
        .bind(token.account_id.0)
        .bind(token.session_id.0)
        .bind(token.revoked_at)
        .bind(token.used_at)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::CannotCreateRefreshToken(e.to_string()))?;

        Ok(token)
    }

    async fn get_access_token(&self, hash: &str) -> Result<AccessToken, AuthError> {
        let row: Option<AccessTokenRow> = sqlx::query_as(
            r#"
            SELECT id, hash, identity_id, account_id, session_id, roles, data,
                   revoked_at, expires_at, created_at
            FROM access_tokens
            WHERE hash = $1
            "#,
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(AccessToken::from).ok_or(AuthError::TokenNotExist)
    }

    async fn get_refresh_token(&self, hash: &str) -> Result<RefreshToken, AuthError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            r#"
            SELECT id, hash, identity_id, account_id, session_id,
                   revoked_at, used_at, expires_at, created_at
            FROM refresh_tokens
            WHERE hash = $1
            "#,
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(RefreshToken::from).ok_or(AuthError::TokenNotExist)
    }

    async fn revoke_access_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError> {
        self.revoke_by_hash("access_tokens", hash, at).await
    }

    async fn revoke_refresh_token(&self, hash: &str, at: DateTime<Utc>) -> Result<(), AuthError> {
        self.revoke_by_hash("refresh_tokens", hash, at).await
    }

    async fn revoke_session_tokens(
        &self,
        session_id: &SessionId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        for table in ["access_tokens", "refresh_tokens"] {
            let sql = format!("UPDATE {} SET {} WHERE session_id = $1", table, REVOKE_AT);
            sqlx::query(&sql)
                .bind(session_id.0)
                .bind(at)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)
    }

    async fn revoke_session_access_tokens(
        &self,
        session_id: &SessionId,
        at: DateTime<Utc>,
        except: Uuid,
    ) -> Result<(), AuthError> {
        let sql = format!(
            "UPDATE access_tokens SET {} WHERE session_id = $1 AND id <> $3",
            REVOKE_AT
        );
        sqlx::query(&sql)
            .bind(session_id.0)
            .bind(at)
            .bind(except)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn revoke_user_tokens(
        &self,
        account_id: &AccountId,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        for table in ["access_tokens", "refresh_tokens"] {
            let sql = format!("UPDATE {} SET {} WHERE account_id = $1", table, REVOKE_AT);
            sqlx::query(&sql)
                .bind(account_id.0)
                .bind(at)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)
    }

    async fn use_refresh_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AuthError> {
        let sql = format!(
            "UPDATE refresh_tokens SET used_at = $2, {} WHERE id = $1 AND used_at IS NULL",
            REVOKE_AT
        );
        let updated = sqlx::query(&sql)
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?;

        match exists {
            Some(_) => Ok(false),
            None => Err(AuthError::TokenNotExist),
        }
    }
}
