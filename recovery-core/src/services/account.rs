use std::sync::Arc;

use crate::{
    Account, Error,
    error::CryptoError,
    repositories::AccountRepository,
    storage::NewAccount,
    validation::{normalize_email, validate_email, validate_new_password},
};

/// Service for the account operations the reset flow depends on.
pub struct AccountService<R: AccountRepository> {
    repository: Arc<R>,
    password_min_length: usize,
}

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repository: Arc<R>, password_min_length: usize) -> Self {
        Self {
            repository,
            password_min_length,
        }
    }

    /// Create an account with an initial password.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<Account, Error> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_new_password(password, self.password_min_length)?;

        let mut account = NewAccount::new(&email, password.trim());
        account.name = name;

        let account = self.repository.create(account).await?;
        tracing::info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.repository.find_by_email(&normalize_email(email)).await
    }

    /// True when `password` matches the stored hash for the account at `email`.
    /// Unknown accounts and accounts without a password never match.
    pub async fn check_password(&self, email: &str, password: &str) -> Result<bool, Error> {
        let Some(account) = self.get_account_by_email(email).await? else {
            return Ok(false);
        };
        let Some(hash) = self.repository.get_password_hash(&account.id).await? else {
            return Ok(false);
        };

        let password = password.to_string();
        tokio::task::spawn_blocking(move || password_auth::verify_password(password, &hash).is_ok())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Password verification task failed");
                Error::Crypto(CryptoError::Hash(e.to_string()))
            })
    }
}
