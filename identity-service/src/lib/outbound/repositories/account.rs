use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::database_error;
use crate::domain::account::models::Account;
use crate::domain::account::models::AccountId;
use crate::domain::account::models::Status;
use crate::domain::account::ports::AccountRepository;
use crate::domain::errors::AuthError;

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    roles: Vec<String>,
    status: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AuthError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId(row.id),
            roles: row.roles.into_iter().collect(),
            status: Status::from_str(&row.status).map_err(AuthError::Unknown)?,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Identity rows keep their own status; reads resolve the account's on top.
    async fn set_status(&self, id: &AccountId, status: Status) -> Result<(), AuthError> {
        let updated = sqlx::query("UPDATE accounts SET status = $2 WHERE id = $1")
            .bind(id.0)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        if updated.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create(&self, account: Account) -> Result<Account, AuthError> {
        let roles: Vec<String> = account.roles.iter().cloned().collect();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, roles, status, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(account.id.0)
        .bind(&roles)
        .bind(account.status.as_str())
        .bind(&account.metadata)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e, "accounts_pkey") {
                return AuthError::AccountExists;
            }
            AuthError::CannotCreateAccount(e.to_string())
        })?;

        Ok(account)
    }

    async fn get(&self, id: &AccountId) -> Result<Account, AuthError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, roles, status, metadata, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.ok_or(AuthError::AccountNotFound)?.try_into()
    }

    async fn add_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET roles = ARRAY(SELECT DISTINCT unnest(roles || $2::text[]))
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(roles)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }
        Ok(())
    }

    async fn remove_roles(&self, id: &AccountId, roles: &[String]) -> Result<(), AuthError> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET roles = ARRAY(SELECT unnest(roles) EXCEPT SELECT unnest($2::text[]))
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(roles)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }
        Ok(())
    }

    async fn remove_account(&self, id: &AccountId) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        for statement in [
            "DELETE FROM reset_password_requests WHERE account_id = $1",
            "DELETE FROM credentials WHERE owner_id = $1",
            "DELETE FROM identities WHERE account_id = $1",
        ] {
            sqlx::query(statement)
                .bind(id.0)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
        }

        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        if deleted.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }

        tx.commit().await.map_err(database_error)
    }

    async fn block_account(&self, id: &AccountId) -> Result<(), AuthError> {
        self.set_status(id, Status::Blocked).await
    }

    async fn unblock_account(&self, id: &AccountId) -> Result<(), AuthError> {
        self.set_status(id, Status::Active).await
    }
}
