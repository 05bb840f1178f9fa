//! Versioned schema migrations shared by the storage backends.

use std::collections::HashSet;

use async_trait::async_trait;
use recovery_core::error::StorageError;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

impl From<MigrationError> for recovery_core::Error {
    fn from(err: MigrationError) -> Self {
        tracing::error!(error = %err, "Migration failed");
        recovery_core::Error::Storage(StorageError::Migration(err.to_string()))
    }
}

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix seconds
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_recovery_migrations"
    }

    /// Initialize migration tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Rollback migrations
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Get list of applied migrations
    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    /// Check if specific migration was applied
    async fn is_applied(&self, version: i64) -> Result<bool>;
}

/// Rejects a migration list whose versions repeat or are not strictly increasing.
pub fn validate_versions(versions: impl IntoIterator<Item = i64>) -> Result<()> {
    let mut seen = HashSet::new();
    let mut previous = None;

    for version in versions {
        if !seen.insert(version) {
            return Err(MigrationError::Migration(format!(
                "Duplicate migration version {version}"
            )));
        }
        if previous.is_some_and(|prev| version < prev) {
            return Err(MigrationError::Migration(format!(
                "Migration version {version} is out of order"
            )));
        }
        previous = Some(version);
    }

    Ok(())
}
