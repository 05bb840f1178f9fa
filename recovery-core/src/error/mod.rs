pub mod utilities;

pub use utilities::DatabaseResultExt;

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reset error: {0}")]
    Reset(#[from] ResetError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Expected protocol outcomes that are not successes.
///
/// These are safe to surface to callers; the HTTP layer decides how much of each
/// variant is disclosed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResetError {
    #[error("No account is registered for this email")]
    AccountNotFound,

    /// Wrong, malformed, expired or unknown OTP. `remaining` is only set after a
    /// counted wrong submission that still leaves attempts.
    #[error("Incorrect email or OTP code")]
    InvalidOtp { remaining: Option<u32> },

    #[error("Too many incorrect attempts")]
    Locked,

    #[error("OTP requested too recently")]
    Cooldown,

    #[error("Rate limit exceeded, retry after {}s", retry_after.num_seconds())]
    RateLimited { retry_after: Duration },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

impl ValidationError {
    /// The caller-facing message carried by the variant.
    pub fn message(&self) -> &str {
        match self {
            ValidationError::InvalidEmail(msg)
            | ValidationError::InvalidPassword(msg)
            | ValidationError::InvalidField(msg)
            | ValidationError::MissingField(msg) => msg,
        }
    }
}

impl Error {
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_reset_error(&self) -> bool {
        matches!(self, Error::Reset(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Errors whose root cause must be logged server-side and hidden from callers.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Crypto(_) | Error::Delivery(_)
        )
    }

    /// The protocol outcome, if this error is one.
    pub fn as_reset_error(&self) -> Option<&ResetError> {
        match self {
            Error::Reset(err) => Some(err),
            _ => None,
        }
    }
}
