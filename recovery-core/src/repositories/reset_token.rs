use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, ResetToken, ResetTokenId, storage::NewResetToken};

/// Repository for reset tokens.
///
/// Storage does not enforce "one active token per email"; the reset service does,
/// by purging older tokens whenever it issues or consumes one.
#[async_trait]
pub trait ResetTokenRepository: Send + Sync + 'static {
    /// The most recently created `Active` token for the email, expired or not.
    async fn find_latest_active(&self, email: &str) -> Result<Option<ResetToken>, Error>;

    /// Persist a new `Active` token with zero failures.
    async fn create(&self, token: NewResetToken) -> Result<ResetToken, Error>;

    /// Move the token to `Expired`.
    async fn mark_expired(&self, id: &ResetTokenId) -> Result<(), Error>;

    /// Atomically increment the failure counter and stamp `last_attempt_at`.
    ///
    /// Returns the new count, or `None` if the token no longer exists. Concurrent
    /// calls must each observe a distinct count.
    async fn record_failed_attempt(
        &self,
        id: &ResetTokenId,
        at: DateTime<Utc>,
    ) -> Result<Option<u32>, Error>;

    /// Reset the failure counter after a correct code and stamp `last_attempt_at`.
    async fn record_success(&self, id: &ResetTokenId, at: DateTime<Utc>) -> Result<(), Error>;

    /// Move the token from `Active` to `Consumed` with its failure counter cleared.
    ///
    /// The transition is conditional: it only happens while the token is still
    /// `Active` with fewer than `max_failed_attempts` failures. Returns `false` when
    /// no token was transitioned, so of several concurrent callers exactly one wins.
    async fn consume(
        &self,
        id: &ResetTokenId,
        max_failed_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, Error>;

    async fn delete(&self, id: &ResetTokenId) -> Result<(), Error>;

    /// Returns the number of tokens removed.
    async fn delete_all_for_email(&self, email: &str) -> Result<u64, Error>;

    /// Delete every token for the email except `keep`. Returns the number removed.
    async fn delete_others_for_email(&self, email: &str, keep: &ResetTokenId)
    -> Result<u64, Error>;

    /// Delete tokens whose `expires_at` is at or before `now`. Returns the number removed.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
