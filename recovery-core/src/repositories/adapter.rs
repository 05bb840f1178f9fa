//! Adapters exposing the repositories of a [`RepositoryProvider`] as standalone
//! repository implementations, so services can hold them behind an `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Account, AccountId, Error, ResetToken, ResetTokenId,
    repositories::{AccountRepository, RepositoryProvider, ResetTokenRepository},
    storage::{NewAccount, NewResetToken},
};

pub struct AccountRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AccountRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AccountRepository for AccountRepositoryAdapter<R> {
    async fn create(&self, account: NewAccount) -> Result<Account, Error> {
        self.provider.account().create(account).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_email(email).await
    }

    async fn update_password(&self, id: &AccountId, password: &str) -> Result<(), Error> {
        self.provider.account().update_password(id, password).await
    }

    async fn get_password_hash(&self, id: &AccountId) -> Result<Option<String>, Error> {
        self.provider.account().get_password_hash(id).await
    }
}

pub struct ResetTokenRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> ResetTokenRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> ResetTokenRepository for ResetTokenRepositoryAdapter<R> {
    async fn find_latest_active(&self, email: &str) -> Result<Option<ResetToken>, Error> {
        self.provider.reset_token().find_latest_active(email).await
    }

    async fn create(&self, token: NewResetToken) -> Result<ResetToken, Error> {
        self.provider.reset_token().create(token).await
    }

    async fn mark_expired(&self, id: &ResetTokenId) -> Result<(), Error> {
        self.provider.reset_token().mark_expired(id).await
    }

    async fn record_failed_attempt(
        &self,
        id: &ResetTokenId,
        at: DateTime<Utc>,
    ) -> Result<Option<u32>, Error> {
        self.provider.reset_token().record_failed_attempt(id, at).await
    }

    async fn record_success(&self, id: &ResetTokenId, at: DateTime<Utc>) -> Result<(), Error> {
        self.provider.reset_token().record_success(id, at).await
    }

    async fn consume(
        &self,
        id: &ResetTokenId,
        max_failed_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        self.provider
            .reset_token()
            .consume(id, max_failed_attempts, at)
            .await
    }

    async fn delete(&self, id: &ResetTokenId) -> Result<(), Error> {
        self.provider.reset_token().delete(id).await
    }

    async fn delete_all_for_email(&self, email: &str) -> Result<u64, Error> {
        self.provider.reset_token().delete_all_for_email(email).await
    }

    async fn delete_others_for_email(
        &self,
        email: &str,
        keep: &ResetTokenId,
    ) -> Result<u64, Error> {
        self.provider
            .reset_token()
            .delete_others_for_email(email, keep)
            .await
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.reset_token().cleanup_expired(now).await
    }
}
