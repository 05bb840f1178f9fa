//! In-memory collaborators for service tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::{
    Account, AccountId, Error, ResetToken, ResetTokenId, TokenState,
    error::{DeliveryError, StorageError},
    repositories::{AccountRepository, ResetTokenRepository},
    services::OtpSender,
    storage::{NewAccount, NewResetToken},
};

#[derive(Default, Clone)]
pub struct MockAccountRepository {
    accounts: Arc<Mutex<HashMap<String, (Account, Option<String>)>>>,
    pub calls: Arc<AtomicUsize>,
}

impl MockAccountRepository {
    pub async fn insert(&self, email: &str, password: &str) -> Account {
        self.create(NewAccount::new(email, password)).await.unwrap()
    }

    pub async fn remove(&self, email: &str) {
        self.accounts.lock().await.remove(email);
    }
}

#[async_trait]
impl AccountRepository for MockAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let created = Account {
            id: account.id,
            email: account.email.clone(),
            name: account.name,
            created_at: now,
            updated_at: now,
        };
        let hash = password_auth::generate_hash(&account.password);
        self.accounts
            .lock()
            .await
            .insert(account.email, (created.clone(), Some(hash)));
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .accounts
            .lock()
            .await
            .get(email)
            .map(|(account, _)| account.clone()))
    }

    async fn update_password(&self, id: &AccountId, password: &str) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().await;
        let entry = accounts
            .values_mut()
            .find(|(account, _)| &account.id == id)
            .ok_or(Error::Storage(StorageError::NotFound))?;
        entry.1 = Some(password_auth::generate_hash(password));
        Ok(())
    }

    async fn get_password_hash(&self, id: &AccountId) -> Result<Option<String>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .accounts
            .lock()
            .await
            .values()
            .find(|(account, _)| &account.id == id)
            .and_then(|(_, hash)| hash.clone()))
    }
}

#[derive(Default, Clone)]
pub struct MockResetTokenRepository {
    tokens: Arc<Mutex<Vec<ResetToken>>>,
    pub calls: Arc<AtomicUsize>,
    pub fail_writes: Arc<AtomicBool>,
}

impl MockResetTokenRepository {
    pub async fn all(&self) -> Vec<ResetToken> {
        self.tokens.lock().await.clone()
    }

    pub async fn get(&self, id: &ResetTokenId) -> Option<ResetToken> {
        self.tokens.lock().await.iter().find(|t| &t.id == id).cloned()
    }

    /// Shift a token's timestamps into the past.
    pub async fn age(&self, id: &ResetTokenId, by: Duration) {
        let mut tokens = self.tokens.lock().await;
        if let Some(token) = tokens.iter_mut().find(|t| &t.id == id) {
            token.created_at -= by;
            token.expires_at -= by;
        }
    }

    fn check_writes(&self) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage(StorageError::Database(
                "disk I/O error".to_string(),
            )));
        }
        Ok(())
    }

    async fn update<F>(&self, id: &ResetTokenId, f: F) -> Result<Option<u32>, Error>
    where
        F: FnOnce(&mut ResetToken),
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;
        let mut tokens = self.tokens.lock().await;
        Ok(tokens.iter_mut().find(|t| &t.id == id).map(|token| {
            f(token);
            token.updated_at = Utc::now();
            token.failed_attempts
        }))
    }
}

#[async_trait]
impl ResetTokenRepository for MockResetTokenRepository {
    async fn find_latest_active(&self, email: &str) -> Result<Option<ResetToken>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tokens
            .lock()
            .await
            .iter()
            .filter(|t| t.email == email && t.state == TokenState::Active)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn create(&self, token: NewResetToken) -> Result<ResetToken, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;
        let now = Utc::now();
        let token = ResetToken {
            id: token.id,
            email: token.email,
            otp_hash: token.otp_hash,
            expires_at: token.expires_at,
            failed_attempts: 0,
            state: TokenState::Active,
            last_attempt_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tokens.lock().await.push(token.clone());
        Ok(token)
    }

    async fn mark_expired(&self, id: &ResetTokenId) -> Result<(), Error> {
        self.update(id, |t| t.state = TokenState::Expired).await?;
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: &ResetTokenId,
        at: DateTime<Utc>,
    ) -> Result<Option<u32>, Error> {
        self.update(id, |t| {
            t.failed_attempts += 1;
            t.last_attempt_at = Some(at);
        })
        .await
    }

    async fn record_success(&self, id: &ResetTokenId, at: DateTime<Utc>) -> Result<(), Error> {
        self.update(id, |t| {
            t.failed_attempts = 0;
            t.last_attempt_at = Some(at);
        })
        .await?;
        Ok(())
    }

    async fn consume(
        &self,
        id: &ResetTokenId,
        max_failed_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;
        let mut tokens = self.tokens.lock().await;
        let Some(token) = tokens.iter_mut().find(|t| {
            &t.id == id
                && t.state == TokenState::Active
                && t.failed_attempts < max_failed_attempts
        }) else {
            return Ok(false);
        };
        token.state = TokenState::Consumed;
        token.failed_attempts = 0;
        token.last_attempt_at = Some(at);
        token.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete(&self, id: &ResetTokenId) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().await.retain(|t| &t.id != id);
        Ok(())
    }

    async fn delete_all_for_email(&self, email: &str) -> Result<u64, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|t| t.email != email);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_others_for_email(
        &self,
        email: &str,
        keep: &ResetTokenId,
    ) -> Result<u64, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|t| t.email != email || &t.id == keep);
        Ok((before - tokens.len()) as u64)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|t| t.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

/// Captures every code it is asked to send.
#[derive(Default, Clone)]
pub struct RecordingOtpSender {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingOtpSender {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn last_otp(&self) -> String {
        self.sent
            .lock()
            .await
            .last()
            .map(|(_, otp)| otp.clone())
            .expect("no OTP was sent")
    }
}

#[async_trait]
impl OtpSender for RecordingOtpSender {
    async fn send_reset_otp(
        &self,
        to: &str,
        otp: &str,
        _expires_in: Duration,
    ) -> Result<(), Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Delivery(DeliveryError::Transport(
                "connection refused".to_string(),
            )));
        }
        self.sent.lock().await.push((to.to_string(), otp.to_string()));
        Ok(())
    }
}
