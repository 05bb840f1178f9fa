use async_trait::async_trait;
use sqlx::SqlitePool;
use recovery_core::{
    Account, AccountId, Error,
    error::{CryptoError, DatabaseResultExt, StorageError},
    repositories::AccountRepository,
    storage::NewAccount,
};

use crate::{SqliteAccount, from_timestamp};

pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn hash_password(password: &str) -> Result<String, Error> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || password_auth::generate_hash(password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing task failed");
            Error::Crypto(CryptoError::Hash(e.to_string()))
        })
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, Error> {
        let now = chrono::Utc::now().timestamp();
        let password_hash = hash_password(&account.password).await?;

        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            INSERT INTO accounts (id, email, name, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.email)
        .bind(&account.name)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_db_err_with_context("Failed to create account")?;

        row.try_into()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(
            "SELECT id, email, name, created_at, updated_at FROM accounts WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_db_err_with_context("Failed to find account")?;

        row.map(Account::try_from).transpose()
    }

    async fn update_password(&self, id: &AccountId, password: &str) -> Result<(), Error> {
        let password_hash = hash_password(password).await?;

        let result =
            sqlx::query("UPDATE accounts SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(password_hash)
                .bind(chrono::Utc::now().timestamp())
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .map_db_err_with_context("Failed to update password")?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(StorageError::NotFound));
        }
        Ok(())
    }

    async fn get_password_hash(&self, id: &AccountId) -> Result<Option<String>, Error> {
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM accounts WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_db_err_with_context("Failed to get password hash")
    }
}

impl TryFrom<SqliteAccount> for Account {
    type Error = Error;

    fn try_from(row: SqliteAccount) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId::new(&row.id),
            email: row.email,
            name: row.name,
            created_at: from_timestamp(row.created_at)?,
            updated_at: from_timestamp(row.updated_at)?,
        })
    }
}
