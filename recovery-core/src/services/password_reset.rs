//! The OTP password reset flow.
//!
//! Three operations share one token store:
//!
//! 1. [`PasswordResetService::request_otp`] issues a code and emails it.
//! 2. [`PasswordResetService::verify_otp`] checks a code without consuming it.
//! 3. [`PasswordResetService::reset_password`] checks a code and sets the new password.
//!
//! Verify and reset resolve the caller's token through [`resolve_active_token`] and
//! count wrong codes identically, so a token locks after the same number of
//! failures whichever endpoint they arrive on.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error, ResetToken,
    config::ResetConfig,
    error::ResetError,
    otp::{generate_otp, hash_otp, verify_otp},
    repositories::{AccountRepository, ResetTokenRepository},
    services::{
        OtpSender,
        rate_limit::{RateLimitResult, RateLimiter, ResetRateLimiters, rate_limit_key},
        reaper::TokenReaper,
    },
    storage::NewResetToken,
    validation::{
        is_well_formed_otp, normalize_email, normalize_otp, validate_email,
        validate_new_password,
    },
};

/// What the store holds for an email, from the point of view of a submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResolution {
    /// Unexpired and below the failure limit.
    Active(ResetToken),
    /// Past `expires_at`; the token has been moved to `Expired`.
    Expired,
    /// The failure limit has been reached.
    Locked,
    /// No active token exists.
    NotFound,
}

/// Looks up the authoritative token for `email` and classifies it.
///
/// The lockout check runs before the expiry check, so a locked token keeps
/// reporting lockout until a new code is requested.
pub async fn resolve_active_token<T: ResetTokenRepository + ?Sized>(
    tokens: &T,
    email: &str,
    now: DateTime<Utc>,
    max_failed_attempts: u32,
) -> Result<TokenResolution, Error> {
    let Some(token) = tokens.find_latest_active(email).await? else {
        return Ok(TokenResolution::NotFound);
    };

    if token.is_locked(max_failed_attempts) {
        return Ok(TokenResolution::Locked);
    }

    if token.is_expired_at(now) {
        tokens.mark_expired(&token.id).await?;
        return Ok(TokenResolution::Expired);
    }

    Ok(TokenResolution::Active(token))
}

/// Service coordinating the reset flow.
pub struct PasswordResetService<A: AccountRepository, T: ResetTokenRepository> {
    accounts: Arc<A>,
    tokens: Arc<T>,
    sender: Arc<dyn OtpSender>,
    limiters: Arc<ResetRateLimiters>,
    config: ResetConfig,
}

impl<A: AccountRepository, T: ResetTokenRepository> PasswordResetService<A, T> {
    pub fn new(
        accounts: Arc<A>,
        tokens: Arc<T>,
        sender: Arc<dyn OtpSender>,
        config: ResetConfig,
    ) -> Self {
        let limiters = Arc::new(ResetRateLimiters::new(
            config.request_otp_limit,
            config.verify_otp_limit,
            config.reset_password_limit,
        ));

        Self {
            accounts,
            tokens,
            sender,
            limiters,
            config,
        }
    }

    pub fn config(&self) -> &ResetConfig {
        &self.config
    }

    pub fn limiters(&self) -> &Arc<ResetRateLimiters> {
        &self.limiters
    }

    /// A reaper over this service's token store and limiters.
    pub fn reaper(&self) -> TokenReaper<T> {
        TokenReaper::new(
            self.tokens.clone(),
            self.limiters.clone(),
            self.config.cleanup_interval,
        )
    }

    /// Issues a new code for `email` and sends it to the account's address.
    ///
    /// Fails with [`ResetError::Cooldown`] while the previous code is younger than
    /// the resend cooldown. If sending fails the new token is deleted again.
    pub async fn request_otp(&self, email: &str, client_ip: Option<IpAddr>) -> Result<(), Error> {
        check_rate_limit(&self.limiters.request_otp, email, client_ip)?;

        let email = normalize_email(email);
        validate_email(&email)?;

        let Some(account) = self.accounts.find_by_email(&email).await? else {
            if self.config.disclose_unknown_accounts {
                return Err(ResetError::AccountNotFound.into());
            }
            tracing::info!(email = %email, "OTP requested for unknown account");
            return Ok(());
        };

        let now = Utc::now();
        if let Some(existing) = self.tokens.find_latest_active(&email).await? {
            if now - existing.created_at < self.config.resend_cooldown {
                tracing::debug!(email = %email, token_id = %existing.id, "OTP resend inside cooldown");
                return Err(ResetError::Cooldown.into());
            }
            self.tokens.delete_all_for_email(&email).await?;
        }

        let otp = generate_otp();
        let otp_hash = hash_otp(&otp).await?;
        let token = self
            .tokens
            .create(NewResetToken::new(
                &email,
                otp_hash,
                now + self.config.otp_expiration,
            ))
            .await?;

        if let Err(e) = self
            .sender
            .send_reset_otp(&account.email, &otp, self.config.otp_expiration)
            .await
        {
            tracing::error!(error = %e, email = %email, token_id = %token.id, "Failed to send password reset OTP");
            if let Err(cleanup) = self.tokens.delete(&token.id).await {
                tracing::error!(error = %cleanup, token_id = %token.id, "Failed to clean up OTP token");
            }
            return Err(e);
        }

        tracing::info!(email = %email, token_id = %token.id, "Password reset OTP issued");
        Ok(())
    }

    /// Checks a code without consuming it. A correct code clears the failure counter.
    pub async fn verify_otp(
        &self,
        email: &str,
        otp: &str,
        client_ip: Option<IpAddr>,
    ) -> Result<(), Error> {
        check_rate_limit(&self.limiters.verify_otp, email, client_ip)?;

        let (email, otp) = normalize_credentials(email, otp)?;
        let token = self.authenticate(&email, &otp).await?;
        self.tokens.record_success(&token.id, Utc::now()).await?;

        tracing::info!(email = %email, token_id = %token.id, "Password reset OTP verified");
        Ok(())
    }

    /// Checks a code and replaces the account password.
    ///
    /// The token is consumed before the password changes. Of several concurrent
    /// resets with the same code only the one that consumes the token proceeds.
    /// Every other token for the email is deleted afterwards.
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
        client_ip: Option<IpAddr>,
    ) -> Result<(), Error> {
        check_rate_limit(&self.limiters.reset_password, email, client_ip)?;

        let (email, otp) = normalize_credentials(email, otp)?;
        let new_password = new_password.trim();
        validate_new_password(new_password, self.config.password_min_length)?;

        let token = self.authenticate(&email, &otp).await?;

        let consumed = self
            .tokens
            .consume(&token.id, self.config.max_failed_attempts, Utc::now())
            .await?;
        if !consumed {
            tracing::info!(email = %email, token_id = %token.id, "Reset token already consumed");
            return Err(ResetError::InvalidOtp { remaining: None }.into());
        }

        let Some(account) = self.accounts.find_by_email(&email).await? else {
            tracing::warn!(email = %email, "Account disappeared during password reset");
            self.tokens.delete_all_for_email(&email).await?;
            return Err(ResetError::InvalidOtp { remaining: None }.into());
        };

        self.accounts
            .update_password(&account.id, new_password)
            .await?;

        self.tokens
            .delete_others_for_email(&email, &token.id)
            .await?;

        tracing::info!(account_id = %account.id, token_id = %token.id, "Password reset completed");
        Ok(())
    }

    /// Resolves the token for `email` and compares `otp` against it, counting a
    /// mismatch. Returns the token only when the code matches.
    async fn authenticate(&self, email: &str, otp: &str) -> Result<ResetToken, Error> {
        let max = self.config.max_failed_attempts;
        let now = Utc::now();

        let token = match resolve_active_token(self.tokens.as_ref(), email, now, max).await? {
            TokenResolution::Active(token) => token,
            TokenResolution::Locked => {
                tracing::debug!(email = %email, "OTP submitted for locked token");
                return Err(ResetError::Locked.into());
            }
            TokenResolution::Expired | TokenResolution::NotFound => {
                return Err(ResetError::InvalidOtp { remaining: None }.into());
            }
        };

        if verify_otp(otp, &token.otp_hash).await? {
            return Ok(token);
        }

        let Some(failed_attempts) = self.tokens.record_failed_attempt(&token.id, now).await?
        else {
            return Err(ResetError::InvalidOtp { remaining: None }.into());
        };

        let remaining = max.saturating_sub(failed_attempts);
        tracing::info!(email = %email, token_id = %token.id, failed_attempts, "Incorrect OTP submitted");

        if remaining == 0 {
            Err(ResetError::Locked.into())
        } else {
            Err(ResetError::InvalidOtp {
                remaining: Some(remaining),
            }
            .into())
        }
    }
}

fn check_rate_limit(
    limiter: &RateLimiter,
    email: &str,
    client_ip: Option<IpAddr>,
) -> Result<(), Error> {
    let key = rate_limit_key(email, client_ip);
    match limiter.check(&key) {
        RateLimitResult::Allowed { .. } => Ok(()),
        RateLimitResult::Limited { retry_after } => {
            tracing::warn!(key = %key, retry_after = retry_after.num_seconds(), "Rate limit exceeded");
            Err(ResetError::RateLimited { retry_after }.into())
        }
    }
}

/// Structurally invalid email or code yields the generic credential error, never a
/// field-specific one.
fn normalize_credentials(email: &str, otp: &str) -> Result<(String, String), Error> {
    let email = normalize_email(email);
    let otp = normalize_otp(otp);

    if validate_email(&email).is_err() || !is_well_formed_otp(&otp) {
        return Err(ResetError::InvalidOtp { remaining: None }.into());
    }

    Ok((email, otp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenState;
    use crate::error::{StorageError, ValidationError};
    use crate::services::AccountService;
    use crate::test_utils::{MockAccountRepository, MockResetTokenRepository, RecordingOtpSender};
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    const EMAIL: &str = "player@example.com";

    struct Harness {
        service: PasswordResetService<MockAccountRepository, MockResetTokenRepository>,
        accounts: MockAccountRepository,
        tokens: MockResetTokenRepository,
        sender: RecordingOtpSender,
    }

    impl Harness {
        async fn new(config: ResetConfig) -> Self {
            let accounts = MockAccountRepository::default();
            let tokens = MockResetTokenRepository::default();
            let sender = RecordingOtpSender::default();
            accounts.insert(EMAIL, "original-password").await;

            let service = PasswordResetService::new(
                Arc::new(accounts.clone()),
                Arc::new(tokens.clone()),
                Arc::new(sender.clone()),
                config,
            );

            Self {
                service,
                accounts,
                tokens,
                sender,
            }
        }

        async fn default() -> Self {
            Self::new(ResetConfig::default().without_rate_limits()).await
        }

        /// Requests a code and returns it.
        async fn issue(&self) -> String {
            self.service.request_otp(EMAIL, None).await.unwrap();
            self.sender.last_otp().await
        }

        async fn only_token(&self) -> ResetToken {
            let tokens = self.tokens.all().await;
            assert_eq!(tokens.len(), 1, "expected exactly one token");
            tokens[0].clone()
        }

        fn account_service(&self) -> AccountService<MockAccountRepository> {
            AccountService::new(Arc::new(self.accounts.clone()), 8)
        }
    }

    /// A well-formed code guaranteed to differ from `otp`.
    fn wrong_code(otp: &str) -> String {
        if otp == "AAAAAA" {
            "BBBBBB".to_string()
        } else {
            "AAAAAA".to_string()
        }
    }

    fn reset_error(result: Result<(), Error>) -> ResetError {
        match result {
            Err(Error::Reset(err)) => err,
            other => panic!("Expected reset error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_otp_issues_hashed_token_and_sends_code() {
        let harness = Harness::default().await;

        let otp = harness.issue().await;
        let token = harness.only_token().await;

        assert_eq!(harness.sender.sent().await, vec![(EMAIL.to_string(), otp.clone())]);
        assert_eq!(token.email, EMAIL);
        assert_eq!(token.state, TokenState::Active);
        assert_eq!(token.failed_attempts, 0);
        assert_ne!(token.otp_hash, otp);
        assert!(password_auth::verify_password(&otp, &token.otp_hash).is_ok());

        let lifetime = token.expires_at - token.created_at;
        assert!((lifetime - Duration::minutes(10)).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn test_request_otp_normalizes_email() {
        let harness = Harness::default().await;

        harness
            .service
            .request_otp("  PLAYER@Example.com ", None)
            .await
            .unwrap();

        assert_eq!(harness.only_token().await.email, EMAIL);
    }

    #[tokio::test]
    async fn test_request_otp_validation_errors() {
        let harness = Harness::default().await;

        match harness.service.request_otp("   ", None).await {
            Err(Error::Validation(ValidationError::MissingField(msg))) => {
                assert_eq!(msg, "Email is required.")
            }
            other => panic!("Expected missing email, got {other:?}"),
        }

        match harness.service.request_otp("not-an-email", None).await {
            Err(Error::Validation(ValidationError::InvalidEmail(msg))) => {
                assert_eq!(msg, "Email format is invalid.")
            }
            other => panic!("Expected invalid email, got {other:?}"),
        }

        assert!(harness.tokens.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_otp_unknown_account_is_disclosed_by_default() {
        let harness = Harness::default().await;

        let err = reset_error(harness.service.request_otp("ghost@example.com", None).await);

        assert_eq!(err, ResetError::AccountNotFound);
        assert!(harness.tokens.all().await.is_empty());
        assert!(harness.sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_otp_unknown_account_can_be_hidden() {
        let harness = Harness::new(
            ResetConfig::default()
                .without_rate_limits()
                .with_disclose_unknown_accounts(false),
        )
        .await;

        harness
            .service
            .request_otp("ghost@example.com", None)
            .await
            .unwrap();

        assert!(harness.tokens.all().await.is_empty());
        assert!(harness.sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_request_inside_cooldown_is_rejected() {
        let harness = Harness::default().await;
        harness.issue().await;

        let err = reset_error(harness.service.request_otp(EMAIL, None).await);

        assert_eq!(err, ResetError::Cooldown);
        assert_eq!(harness.tokens.all().await.len(), 1);
        assert_eq!(harness.sender.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_request_after_cooldown_replaces_previous_token() {
        let harness = Harness::default().await;
        let first_otp = harness.issue().await;
        let first = harness.only_token().await;
        harness.tokens.age(&first.id, Duration::seconds(61)).await;

        let second_otp = harness.issue().await;
        let second = harness.only_token().await;

        assert_ne!(first.id, second.id);

        // only the newest code is honoured
        if first_otp != second_otp {
            let err = reset_error(harness.service.verify_otp(EMAIL, &first_otp, None).await);
            assert_eq!(err, ResetError::InvalidOtp { remaining: Some(4) });
        }
        harness
            .service
            .verify_otp(EMAIL, &second_otp, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_failure_removes_new_token() {
        let harness = Harness::default().await;
        harness.sender.fail.store(true, Ordering::SeqCst);

        let result = harness.service.request_otp(EMAIL, None).await;

        assert!(matches!(result, Err(Error::Delivery(_))));
        assert!(harness.tokens.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_during_request_is_internal() {
        let harness = Harness::default().await;
        harness.tokens.fail_writes.store(true, Ordering::SeqCst);

        let result = harness.service.request_otp(EMAIL, None).await;

        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::Database(_)))
        ));
        assert!(harness.sender.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_verify_otp_success_resets_failures() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;

        let err = reset_error(harness.service.verify_otp(EMAIL, &wrong_code(&otp), None).await);
        assert_eq!(err, ResetError::InvalidOtp { remaining: Some(4) });
        assert_eq!(harness.only_token().await.failed_attempts, 1);

        harness.service.verify_otp(EMAIL, &otp, None).await.unwrap();

        let token = harness.only_token().await;
        assert_eq!(token.failed_attempts, 0);
        assert_eq!(token.state, TokenState::Active);
        assert!(token.last_attempt_at.is_some());
    }

    #[tokio::test]
    async fn test_verify_otp_is_case_insensitive() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;

        harness
            .service
            .verify_otp(EMAIL, &format!(" {} ", otp.to_lowercase()), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_codes_count_down_then_lock() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;
        let wrong = wrong_code(&otp);

        for expected in [4, 3, 2, 1] {
            let err = reset_error(harness.service.verify_otp(EMAIL, &wrong, None).await);
            assert_eq!(
                err,
                ResetError::InvalidOtp {
                    remaining: Some(expected)
                }
            );
        }

        let err = reset_error(harness.service.verify_otp(EMAIL, &wrong, None).await);
        assert_eq!(err, ResetError::Locked);
        assert_eq!(harness.only_token().await.failed_attempts, 5);

        // the correct code no longer helps
        let err = reset_error(harness.service.verify_otp(EMAIL, &otp, None).await);
        assert_eq!(err, ResetError::Locked);

        let err = reset_error(
            harness
                .service
                .reset_password(EMAIL, &otp, "new-password", None)
                .await,
        );
        assert_eq!(err, ResetError::Locked);
        assert_eq!(harness.only_token().await.failed_attempts, 5);
    }

    #[tokio::test]
    async fn test_failures_are_shared_between_verify_and_reset() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;
        let wrong = wrong_code(&otp);

        harness.service.verify_otp(EMAIL, &wrong, None).await.unwrap_err();
        let err = reset_error(
            harness
                .service
                .reset_password(EMAIL, &wrong, "new-password", None)
                .await,
        );

        assert_eq!(err, ResetError::InvalidOtp { remaining: Some(3) });
    }

    #[tokio::test]
    async fn test_expired_token_is_never_accepted() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;
        let token = harness.only_token().await;
        harness.tokens.age(&token.id, Duration::minutes(11)).await;

        let err = reset_error(harness.service.verify_otp(EMAIL, &otp, None).await);
        assert_eq!(err, ResetError::InvalidOtp { remaining: None });

        let expired = harness.tokens.get(&token.id).await.unwrap();
        assert_eq!(expired.state, TokenState::Expired);
        assert_eq!(expired.failed_attempts, 0);

        let err = reset_error(
            harness
                .service
                .reset_password(EMAIL, &otp, "new-password", None)
                .await,
        );
        assert_eq!(err, ResetError::InvalidOtp { remaining: None });
    }

    #[tokio::test]
    async fn test_malformed_input_gets_generic_error() {
        let harness = Harness::default().await;
        harness.issue().await;
        let calls_before = harness.tokens.calls.load(Ordering::SeqCst);

        for (email, otp) in [("", "ABC123"), ("bad", "ABC123"), (EMAIL, "ABC12"), (EMAIL, "ABC-12")] {
            let err = reset_error(harness.service.verify_otp(email, otp, None).await);
            assert_eq!(err, ResetError::InvalidOtp { remaining: None });
        }

        assert_eq!(harness.tokens.calls.load(Ordering::SeqCst), calls_before);
        assert_eq!(harness.only_token().await.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_verify_without_token() {
        let harness = Harness::default().await;

        let err = reset_error(harness.service.verify_otp(EMAIL, "ABC123", None).await);
        assert_eq!(err, ResetError::InvalidOtp { remaining: None });
    }

    #[tokio::test]
    async fn test_short_password_rejected_before_store_access() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;
        let token_calls = harness.tokens.calls.load(Ordering::SeqCst);
        let account_calls = harness.accounts.calls.load(Ordering::SeqCst);

        match harness
            .service
            .reset_password(EMAIL, &otp, "12345", None)
            .await
        {
            Err(Error::Validation(ValidationError::InvalidPassword(msg))) => {
                assert_eq!(msg, "Password must be at least 8 characters.")
            }
            other => panic!("Expected password validation error, got {other:?}"),
        }

        assert_eq!(harness.tokens.calls.load(Ordering::SeqCst), token_calls);
        assert_eq!(harness.accounts.calls.load(Ordering::SeqCst), account_calls);
    }

    #[tokio::test]
    async fn test_full_reset_flow() {
        let harness = Harness::default().await;
        let accounts = harness.account_service();

        let otp = harness.issue().await;
        harness.service.verify_otp(EMAIL, &otp, None).await.unwrap();
        harness
            .service
            .reset_password(EMAIL, &otp, "  brand-new-password  ", None)
            .await
            .unwrap();

        assert!(accounts.check_password(EMAIL, "brand-new-password").await.unwrap());
        assert!(!accounts.check_password(EMAIL, "original-password").await.unwrap());

        let token = harness.only_token().await;
        assert_eq!(token.state, TokenState::Consumed);
        assert_eq!(token.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_code_cannot_be_reused_after_reset() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;

        harness
            .service
            .reset_password(EMAIL, &otp, "brand-new-password", None)
            .await
            .unwrap();

        let err = reset_error(harness.service.verify_otp(EMAIL, &otp, None).await);
        assert_eq!(err, ResetError::InvalidOtp { remaining: None });

        let err = reset_error(
            harness
                .service
                .reset_password(EMAIL, &otp, "another-password", None)
                .await,
        );
        assert_eq!(err, ResetError::InvalidOtp { remaining: None });
        assert!(
            harness
                .account_service()
                .check_password(EMAIL, "brand-new-password")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_concurrent_resets_with_one_code_succeed_once() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;

        let (first, second) = tokio::join!(
            harness
                .service
                .reset_password(EMAIL, &otp, "first-new-password", None),
            harness
                .service
                .reset_password(EMAIL, &otp, "second-new-password", None),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        for result in outcomes.into_iter().filter(|r| r.is_err()) {
            assert_eq!(reset_error(result), ResetError::InvalidOtp { remaining: None });
        }
        assert_eq!(harness.only_token().await.state, TokenState::Consumed);
    }

    #[tokio::test]
    async fn test_reset_for_vanished_account_purges_tokens() {
        let harness = Harness::default().await;
        let otp = harness.issue().await;
        harness.accounts.remove(EMAIL).await;

        let err = reset_error(
            harness
                .service
                .reset_password(EMAIL, &otp, "brand-new-password", None)
                .await,
        );

        assert_eq!(err, ResetError::InvalidOtp { remaining: None });
        assert!(harness.tokens.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_applies_before_validation() {
        let config = ResetConfig {
            request_otp_limit: crate::config::RateLimitConfig::new(2, Duration::minutes(15)),
            ..ResetConfig::default()
        };
        let harness = Harness::new(config).await;
        let ip: IpAddr = "198.51.100.4".parse().unwrap();

        for _ in 0..2 {
            let result = harness.service.request_otp("", Some(ip)).await;
            assert!(matches!(result, Err(Error::Validation(_))));
        }

        let err = reset_error(harness.service.request_otp("", Some(ip)).await);
        assert!(matches!(err, ResetError::RateLimited { retry_after } if retry_after > Duration::zero()));

        // a different client is unaffected
        let other: IpAddr = "198.51.100.5".parse().unwrap();
        assert!(matches!(
            harness.service.request_otp("", Some(other)).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_keys_on_email() {
        let config = ResetConfig {
            verify_otp_limit: crate::config::RateLimitConfig::new(1, Duration::minutes(15)),
            ..ResetConfig::default()
        };
        let harness = Harness::new(config).await;
        let first: IpAddr = "198.51.100.4".parse().unwrap();
        let second: IpAddr = "198.51.100.5".parse().unwrap();

        harness
            .service
            .verify_otp(EMAIL, "ABC123", Some(first))
            .await
            .unwrap_err();
        let err = reset_error(
            harness
                .service
                .verify_otp("Player@Example.com", "ABC123", Some(second))
                .await,
        );

        assert!(matches!(err, ResetError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_resolve_active_token() {
        let tokens = MockResetTokenRepository::default();
        let now = Utc::now();

        assert_eq!(
            resolve_active_token(&tokens, EMAIL, now, 5).await.unwrap(),
            TokenResolution::NotFound
        );

        let token = tokens
            .create(NewResetToken::new(EMAIL, "hash".to_string(), now + Duration::minutes(10)))
            .await
            .unwrap();
        assert!(matches!(
            resolve_active_token(&tokens, EMAIL, now, 5).await.unwrap(),
            TokenResolution::Active(t) if t.id == token.id
        ));

        for _ in 0..5 {
            tokens.record_failed_attempt(&token.id, now).await.unwrap();
        }
        // lockout wins over expiry
        assert_eq!(
            resolve_active_token(&tokens, EMAIL, now + Duration::minutes(11), 5)
                .await
                .unwrap(),
            TokenResolution::Locked
        );
    }

    #[tokio::test]
    async fn test_reaper_removes_expired_tokens() {
        let harness = Harness::default().await;
        harness.issue().await;
        let token = harness.only_token().await;

        assert_eq!(harness.service.reaper().run_once().await.unwrap(), 0);

        harness.tokens.age(&token.id, Duration::minutes(11)).await;
        assert_eq!(harness.service.reaper().run_once().await.unwrap(), 1);
        assert!(harness.tokens.all().await.is_empty());
    }
}
