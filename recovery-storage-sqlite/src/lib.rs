//! SQLite storage backend for the recovery password-reset service.
//!
//! ```rust,ignore
//! use recovery_storage_sqlite::SqliteStorage;
//! use recovery_core::repositories::RepositoryProvider;
//!
//! let provider = SqliteStorage::connect("sqlite://recovery.db").await?.into_repository_provider();
//! provider.migrate().await?;
//! ```
//!
//! All timestamps are stored as INTEGER unix seconds.
mod migrations;
mod repositories;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recovery_core::{
    Error,
    error::{DatabaseResultExt, StorageError},
    repositories::{AccountRepositoryProvider, RepositoryProvider, ResetTokenRepositoryProvider},
};
use recovery_migration::MigrationManager;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

pub use migrations::SqliteMigrationManager;
pub use repositories::{SqliteAccountRepository, SqliteResetTokenRepository};

/// A connected SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url`, creating the database file if it does not exist yet.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            Error::Storage(StorageError::Connection(e.to_string()))
        })?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_repository_provider(self) -> SqliteRepositoryProvider {
        SqliteRepositoryProvider::new(self.pool)
    }
}

/// Repository provider implementation for SQLite
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    account: Arc<SqliteAccountRepository>,
    reset_token: Arc<SqliteResetTokenRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let account = Arc::new(SqliteAccountRepository::new(pool.clone()));
        let reset_token = Arc::new(SqliteResetTokenRepository::new(pool.clone()));

        Self {
            pool,
            account,
            reset_token,
        }
    }
}

impl AccountRepositoryProvider for SqliteRepositoryProvider {
    type AccountRepo = SqliteAccountRepository;

    fn account(&self) -> &Self::AccountRepo {
        &self.account
    }
}

impl ResetTokenRepositoryProvider for SqliteRepositoryProvider {
    type ResetTokenRepo = SqliteResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo {
        &self.reset_token
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await?;
        manager.up(&migrations::all()).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_db_err_with_context("Health check failed")?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqliteAccount {
    id: String,
    email: String,
    name: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqliteResetToken {
    id: String,
    email: String,
    otp_hash: String,
    expires_at: i64,
    failed_attempts: i64,
    state: String,
    last_attempt_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

pub(crate) fn from_timestamp(seconds: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        Error::Storage(StorageError::Database(format!(
            "Invalid timestamp: {seconds}"
        )))
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn setup_provider() -> SqliteRepositoryProvider {
        let _ = tracing_subscriber::fmt().try_init();
        let provider = SqliteStorage::connect("sqlite::memory:")
            .await
            .expect("Failed to connect")
            .into_repository_provider();
        provider.migrate().await.expect("Failed to migrate");
        provider
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let provider = setup_provider().await;
        provider.migrate().await.unwrap();
        provider.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = SqliteStorage::connect("postgres://nope").await;
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::Connection(_)))
        ));
    }

    #[test]
    fn test_from_timestamp() {
        assert_eq!(from_timestamp(0).unwrap().timestamp(), 0);
        assert!(from_timestamp(i64::MAX).is_err());
    }
}
