//! Background removal of expired reset tokens and idle rate-limit entries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::{Error, repositories::ResetTokenRepository, services::rate_limit::ResetRateLimiters};

/// Periodically deletes tokens past `expires_at` and prunes the rate limiters.
pub struct TokenReaper<T: ResetTokenRepository> {
    tokens: Arc<T>,
    limiters: Arc<ResetRateLimiters>,
    interval: Duration,
}

impl<T: ResetTokenRepository> TokenReaper<T> {
    pub fn new(tokens: Arc<T>, limiters: Arc<ResetRateLimiters>, interval: Duration) -> Self {
        Self {
            tokens,
            limiters,
            interval,
        }
    }

    /// One cleanup pass. Returns the number of tokens deleted.
    pub async fn run_once(&self) -> Result<u64, Error> {
        let deleted = self.tokens.cleanup_expired(Utc::now()).await?;
        let pruned = self.limiters.prune();

        if deleted > 0 || pruned > 0 {
            tracing::debug!(deleted, pruned, "Reaped expired reset tokens");
        }
        Ok(deleted)
    }

    /// Runs [`run_once`](Self::run_once) every interval until the handle is aborted.
    /// Failures are logged and the loop continues.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Failed to clean up expired reset tokens");
                }
            }
        })
    }
}
