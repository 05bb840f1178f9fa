use crate::{Account, AccountId, Error, storage::NewAccount};
use async_trait::async_trait;

/// Repository for account data access.
///
/// Implementations own password hashing: plaintext goes in, only hashes are
/// persisted.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Create an account with an initial password
    async fn create(&self, account: NewAccount) -> Result<Account, Error>;

    /// Find an account by its normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error>;

    /// Hash and store a new password for the account
    async fn update_password(&self, id: &AccountId, password: &str) -> Result<(), Error>;

    /// Fetch the stored password hash, if any
    async fn get_password_hash(&self, id: &AccountId) -> Result<Option<String>, Error>;
}
