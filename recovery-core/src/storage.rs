//! Inputs accepted by the repositories.

use chrono::{DateTime, Utc};

use crate::{AccountId, ResetTokenId, validation::normalize_email};

/// A seeded account with its initial plaintext password. The account store
/// hashes the password before persisting it.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: AccountId,
    pub email: String,
    pub name: Option<String>,
    pub password: String,
}

impl NewAccount {
    pub fn new(email: &str, password: impl Into<String>) -> Self {
        Self {
            id: AccountId::new_random(),
            email: normalize_email(email),
            name: None,
            password: password.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A freshly issued token. It starts `Active` with no failures.
#[derive(Debug, Clone)]
pub struct NewResetToken {
    pub id: ResetTokenId,
    pub email: String,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl NewResetToken {
    pub fn new(email: &str, otp_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: ResetTokenId::new_random(),
            email: email.to_string(),
            otp_hash,
            expires_at,
        }
    }
}
