//! # Recovery
//!
//! Recovery implements the one-time-code password reset flow for an existing
//! account store:
//!
//! 1. `request_otp` issues a short code, stores only its hash and emails it.
//! 2. `verify_otp` checks the code without consuming it.
//! 3. `reset_password` checks the code again, replaces the password and retires
//!    the code.
//!
//! Every step is rate limited per email (or client IP), wrong codes are counted
//! towards a lockout, codes expire, and a resend cooldown stops inbox flooding.
//!
//! ## Example
//!
//! ```rust,no_run
//! use recovery::RecoveryBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recovery = RecoveryBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     recovery.request_otp("player@example.com", None).await?;
//!     Ok(())
//! }
//! ```
use std::net::IpAddr;
use std::sync::Arc;

use recovery_core::{
    repositories::{AccountRepositoryAdapter, ResetTokenRepositoryAdapter},
    services::{AccountService, PasswordResetService, TokenReaper},
};
use tokio::task::JoinHandle;

mod builder;

pub use builder::{NoStorage, RecoveryBuilder, RecoveryBuilderError, WithStorage};

/// Re-export core types from recovery_core
pub use recovery_core::{
    Account, AccountId, Error, OtpSender, RateLimitConfig, RepositoryProvider, ResetConfig,
    ResetError, ResetToken, TokenState,
    error::{StorageError, ValidationError},
};

#[cfg(feature = "sqlite")]
pub use recovery_storage_sqlite::{SqliteRepositoryProvider, SqliteStorage};

#[cfg(feature = "mailer")]
pub use recovery_core::services::MailerOtpSender;

#[cfg(feature = "mailer")]
pub use recovery_mailer::{MailerConfig, TransportConfig};

type AccountRepo<R> = AccountRepositoryAdapter<R>;
type TokenRepo<R> = ResetTokenRepositoryAdapter<R>;

/// Entry point tying storage, the email sender and the reset protocol together.
///
/// Construct one with [`RecoveryBuilder`] or [`Recovery::new`] and share it behind
/// an `Arc`. The rate limiters live inside the instance, so every request must go
/// through the same `Recovery`.
pub struct Recovery<R: RepositoryProvider> {
    repositories: Arc<R>,
    account_service: Arc<AccountService<AccountRepo<R>>>,
    reset_service: Arc<PasswordResetService<AccountRepo<R>, TokenRepo<R>>>,
}

impl<R: RepositoryProvider> Recovery<R> {
    /// Create a new instance from a repository provider and an OTP sender.
    pub fn new(repositories: Arc<R>, sender: Arc<dyn OtpSender>, config: ResetConfig) -> Self {
        let account_repo = Arc::new(AccountRepositoryAdapter::new(repositories.clone()));
        let token_repo = Arc::new(ResetTokenRepositoryAdapter::new(repositories.clone()));

        let account_service = Arc::new(AccountService::new(
            account_repo.clone(),
            config.password_min_length,
        ));
        let reset_service = Arc::new(PasswordResetService::new(
            account_repo,
            token_repo,
            sender,
            config,
        ));

        Self {
            repositories,
            account_service,
            reset_service,
        }
    }

    pub fn config(&self) -> &ResetConfig {
        self.reset_service.config()
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Issue and email a reset code for `email`.
    ///
    /// `client_ip` is only used as the rate-limit key when `email` is blank.
    pub async fn request_otp(&self, email: &str, client_ip: Option<IpAddr>) -> Result<(), Error> {
        self.reset_service.request_otp(email, client_ip).await
    }

    /// Check a code without consuming it. A correct code clears the failure counter.
    pub async fn verify_otp(
        &self,
        email: &str,
        otp: &str,
        client_ip: Option<IpAddr>,
    ) -> Result<(), Error> {
        self.reset_service.verify_otp(email, otp, client_ip).await
    }

    /// Replace the account password and retire the code.
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
        client_ip: Option<IpAddr>,
    ) -> Result<(), Error> {
        self.reset_service
            .reset_password(email, otp, new_password, client_ip)
            .await
    }

    /// Seed an account. There is no HTTP surface for this.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<Account, Error> {
        self.account_service
            .create_account(email, password, name)
            .await
    }

    pub async fn get_account(&self, email: &str) -> Result<Option<Account>, Error> {
        self.account_service.get_account_by_email(email).await
    }

    /// True when `password` is the account's current password.
    pub async fn check_password(&self, email: &str, password: &str) -> Result<bool, Error> {
        self.account_service.check_password(email, password).await
    }

    /// The reaper for this instance's token store and rate limiters.
    pub fn token_reaper(&self) -> TokenReaper<TokenRepo<R>> {
        self.reset_service.reaper()
    }

    /// Delete expired tokens and idle rate-limit entries once.
    pub async fn cleanup_expired_tokens(&self) -> Result<u64, Error> {
        self.token_reaper().run_once().await
    }

    /// Run the reaper in the background every `cleanup_interval`.
    pub fn spawn_token_reaper(&self) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = self.config().cleanup_interval.as_secs(),
            "Starting reset token reaper"
        );
        self.token_reaper().spawn()
    }
}
