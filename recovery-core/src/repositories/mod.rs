//! Repository traits for the data access layer.
//!
//! Services only talk to storage through these traits. A backend implements each
//! `*Repository` trait, exposes it through the matching `*RepositoryProvider`, and
//! then implements [`RepositoryProvider`] for lifecycle operations.

pub mod account;
pub mod adapter;
pub mod reset_token;

pub use adapter::{AccountRepositoryAdapter, ResetTokenRepositoryAdapter};
pub use account::AccountRepository;
pub use reset_token::ResetTokenRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for account repository access.
pub trait AccountRepositoryProvider: Send + Sync + 'static {
    type AccountRepo: AccountRepository;

    fn account(&self) -> &Self::AccountRepo;
}

/// Provider trait for reset token repository access.
pub trait ResetTokenRepositoryProvider: Send + Sync + 'static {
    type ResetTokenRepo: ResetTokenRepository;

    fn reset_token(&self) -> &Self::ResetTokenRepo;
}

/// Everything a storage backend must provide to run the reset service.
///
/// ```rust,ignore
/// use recovery_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl AccountRepositoryProvider for MyStorage {
///     type AccountRepo = MyAccountRepository;
///     fn account(&self) -> &Self::AccountRepo { &self.accounts }
/// }
///
/// // ... ResetTokenRepositoryProvider ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: AccountRepositoryProvider + ResetTokenRepositoryProvider {
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
