use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use super::is_unique_violation;
use crate::domain::account::models::AccountId;
use crate::domain::account::models::Status;
use crate::domain::errors::AuthError;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::IdentityKind;
use crate::domain::identity::ports::IdentityRepository;

// Effective roles and status are resolved by joining the owning account.
const SELECT_IDENTITY: &str = r#"
    SELECT i.id, i.account_id, i.identity, i.kind, i.metadata, i.created_at,
           ARRAY(SELECT DISTINCT unnest(i.roles || a.roles)) AS roles,
           CASE WHEN a.status = 'blocked' THEN 'blocked' ELSE i.status END AS status
    FROM identities i
    JOIN accounts a ON a.id = i.account_id
"#;

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    account_id: Uuid,
    identity: String,
    kind: String,
    status: String,
    roles: Vec<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = AuthError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Identity {
            id: IdentityId(row.id),
            account_id: AccountId(row.account_id),
            identity: row.identity,
            kind: IdentityKind::from(row.kind.as_str()),
            status: Status::from_str(&row.status).map_err(AuthError::Unknown)?,
            roles: row.roles.into_iter().collect(),
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_roles(
        &self,
        id: &IdentityId,
        sql: &str,
        roles: &[String],
    ) -> Result<(), AuthError> {
        let updated = sqlx::query(sql)
            .bind(id.0)
            .bind(roles)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::IdentityNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError> {
        let roles: Vec<String> = identity.roles.iter().cloned().collect();

        let inserted = sqlx::query(
            r#"
            INSERT INTO identities (id, account_id, identity, kind, status, roles, metadata, created_at)
            SELECT $1, a.id, $3, $4, $5, $6, $7, $8
            FROM accounts a
            WHERE a.id = $2
            "#,
        )
        .bind(identity.id.0)
        .bind(identity.account_id.0)
        .bind(&identity.identity)
        .bind(identity.kind.as_str())
        .bind(identity.status.as_str())
        .bind(&roles)
        .bind(&identity.metadata)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "identities_identity_key") {
                return AuthError::IdentityExists;
            }
            database_error(e)
        })?;

        if inserted.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }

        self.get_by_id(&identity.id).await
    }

    async fn get(&self, identity: &str) -> Result<Identity, AuthError> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("{} WHERE i.identity = $1", SELECT_IDENTITY))
                .bind(identity)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;

        row.ok_or(AuthError::IdentityNotFound)?.try_into()
    }

    async fn get_by_id(&self, id: &IdentityId) -> Result<Identity, AuthError> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("{} WHERE i.id = $1", SELECT_IDENTITY))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;

        row.ok_or(AuthError::IdentityNotFound)?.try_into()
    }

    async fn add_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError> {
        self.update_roles(
            id,
            "UPDATE identities SET roles = ARRAY(SELECT DISTINCT unnest(roles || $2::text[])) WHERE id = $1",
            roles,
        )
        .await
    }

    async fn remove_roles(&self, id: &IdentityId, roles: &[String]) -> Result<(), AuthError> {
        self.update_roles(
            id,
            "UPDATE identities SET roles = ARRAY(SELECT unnest(roles) EXCEPT SELECT unnest($2::text[])) WHERE id = $1",
            roles,
        )
        .await
    }
}
