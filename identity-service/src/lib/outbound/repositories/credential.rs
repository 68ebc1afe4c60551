use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use crate::domain::account::models::AccountId;
use crate::domain::credential::models::Credential;
use crate::domain::credential::models::CredentialKind;
use crate::domain::credential::ports::CredentialRepository;
use crate::domain::errors::AuthError;

const INSERT_CREDENTIAL: &str = r#"
    INSERT INTO credentials (id, owner_id, hash, kind, expires_at, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    owner_id: Uuid,
    hash: String,
    kind: String,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = AuthError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(Credential {
            id: row.id,
            owner_id: AccountId(row.owner_id),
            hash: row.hash,
            kind: CredentialKind::from_str(&row.kind).map_err(AuthError::Unknown)?,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

fn insert(
    credential: &Credential,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_CREDENTIAL)
        .bind(credential.id)
        .bind(credential.owner_id.0)
        .bind(&credential.hash)
        .bind(credential.kind.as_str())
        .bind(credential.expires_at)
        .bind(credential.created_at)
}

pub struct PostgresCredentialRepository {
    pool: PgPool,
}

impl PostgresCredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PostgresCredentialRepository {
    async fn create(&self, credential: Credential) -> Result<Credential, AuthError> {
        insert(&credential)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::CannotCreateCredential(e.to_string()))?;

        Ok(credential)
    }

    async fn get_last(
        &self,
        owner_id: &AccountId,
        kind: CredentialKind,
    ) -> Result<Credential, AuthError> {
        let row: Option<CredentialRow> = sqlx::query_as(
            r#"
            SELECT id, owner_id, hash, kind, expires_at, created_at
            FROM credentials
            WHERE owner_id = $1 AND kind = $2
            ORDER BY created_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(owner_id.0)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.ok_or(AuthError::CredentialNotFound)?.try_into()
    }

    async fn remove_credentials(&self, owner_id: &AccountId) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM credentials WHERE owner_id = $1")
            .bind(owner_id.0)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn replace_credentials(
        &self,
        owner_id: &AccountId,
        credential: Credential,
    ) -> Result<Credential, AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query("DELETE FROM credentials WHERE owner_id = $1")
            .bind(owner_id.0)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        insert(&credential)
            .execute(&mut *tx)
            .await
            .map_err(|e| AuthError::CannotCreateCredential(e.to_string()))?;

        tx.commit().await.map_err(database_error)?;

        Ok(credential)
    }
}
