//! Builder pattern for constructing Recovery instances
//!
//! Storage must be configured before [`RecoveryBuilder::build`] is available,
//! which the type-state markers [`NoStorage`] and [`WithStorage`] enforce at
//! compile time.
//!
//! # Example
//!
//! ```rust,no_run
//! use recovery::{RecoveryBuilder, ResetConfig};
//! use chrono::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recovery = RecoveryBuilder::new()
//!         .with_sqlite("sqlite://recovery.db?mode=rwc")
//!         .await?
//!         .with_config(ResetConfig::default().with_otp_expiration(Duration::minutes(5)))
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use recovery_core::{OtpSender, RepositoryProvider, ResetConfig};

use crate::Recovery;

#[cfg(feature = "mailer")]
use crate::{MailerConfig, MailerOtpSender};

/// Errors that can occur when building a Recovery instance.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Failed to configure mailer
    #[cfg(feature = "mailer")]
    #[error("Mailer configuration failed: {0}")]
    MailerConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for constructing [`Recovery`] instances.
///
/// # Defaults
///
/// - Reset configuration: [`ResetConfig::default`]
/// - OTP sender: the mailer with [`MailerConfig::default`] (file transport) when
///   the `mailer` feature is enabled, otherwise none and `build` fails
/// - Apply migrations: false
pub struct RecoveryBuilder<Storage> {
    storage: Storage,
    config: ResetConfig,
    sender: Option<Arc<dyn OtpSender>>,
    apply_migrations: bool,
    #[cfg(feature = "mailer")]
    mailer_config: Option<MailerConfig>,
}

impl Default for RecoveryBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryBuilder<NoStorage> {
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            config: ResetConfig::default(),
            sender: None,
            apply_migrations: false,
            #[cfg(feature = "mailer")]
            mailer_config: None,
        }
    }

    /// Use an existing repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> RecoveryBuilder<WithStorage<R>> {
        RecoveryBuilder {
            storage: WithStorage { repositories },
            config: self.config,
            sender: self.sender,
            apply_migrations: self.apply_migrations,
            #[cfg(feature = "mailer")]
            mailer_config: self.mailer_config,
        }
    }
}

#[cfg(feature = "sqlite")]
impl RecoveryBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<RecoveryBuilder<WithStorage<crate::SqliteRepositoryProvider>>, RecoveryBuilderError>
    {
        let storage = crate::SqliteStorage::connect(url)
            .await
            .map_err(|e| RecoveryBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(storage.into_repository_provider())))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> RecoveryBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::SqliteRepositoryProvider::new(pool)))
    }
}

impl<R: RepositoryProvider> RecoveryBuilder<WithStorage<R>> {
    /// Replace the reset configuration (lifetimes, limits, lockout threshold).
    pub fn with_config(mut self, config: ResetConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver codes through a custom sender. Takes precedence over any mailer
    /// configuration.
    pub fn with_otp_sender(mut self, sender: Arc<dyn OtpSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Set whether to apply database migrations during `build`.
    ///
    /// Default: false
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    /// Deliver codes by email using the given transport configuration.
    #[cfg(feature = "mailer")]
    pub fn with_mailer(mut self, config: MailerConfig) -> Self {
        self.mailer_config = Some(config);
        self
    }

    /// Deliver codes by email, configured from the environment.
    ///
    /// See [`MailerConfig::from_env`] for the variables read.
    #[cfg(feature = "mailer")]
    pub fn with_mailer_from_env(mut self) -> Result<Self, RecoveryBuilderError> {
        let config = MailerConfig::from_env()
            .map_err(|e| RecoveryBuilderError::MailerConfiguration(e.to_string()))?;
        self.mailer_config = Some(config);
        Ok(self)
    }

    fn resolve_sender(&mut self) -> Result<Arc<dyn OtpSender>, RecoveryBuilderError> {
        match self.sender.take() {
            Some(sender) => Ok(sender),
            None => self.default_sender(),
        }
    }

    #[cfg(feature = "mailer")]
    fn default_sender(&mut self) -> Result<Arc<dyn OtpSender>, RecoveryBuilderError> {
        let config = self.mailer_config.take().unwrap_or_default();
        let sender = MailerOtpSender::new(config)
            .map_err(|e| RecoveryBuilderError::MailerConfiguration(e.to_string()))?;
        Ok(Arc::new(sender))
    }

    #[cfg(not(feature = "mailer"))]
    fn default_sender(&mut self) -> Result<Arc<dyn OtpSender>, RecoveryBuilderError> {
        Err(RecoveryBuilderError::InvalidConfiguration(
            "an OTP sender is required".to_string(),
        ))
    }

    /// Build the Recovery instance, applying migrations first if requested.
    pub async fn build(mut self) -> Result<Recovery<R>, RecoveryBuilderError> {
        if self.config.max_failed_attempts == 0 {
            return Err(RecoveryBuilderError::InvalidConfiguration(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }

        let sender = self.resolve_sender()?;

        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| RecoveryBuilderError::Migration(e.to_string()))?;
        }

        Ok(Recovery::new(self.storage.repositories, sender, self.config))
    }
}
