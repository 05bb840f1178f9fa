//! Reset tokens and their lifecycle.
//!
//! A token is one attempt at resetting the password for an email. It moves
//! through the following states:
//!
//! ```text
//! ACTIVE --wrong code--> ACTIVE (failed_attempts + 1)
//! ACTIVE --wrong code, failed_attempts reaches max--> locked
//! ACTIVE --expires_at passed--> EXPIRED
//! ACTIVE --correct code + password reset--> CONSUMED
//! ```
//!
//! "Locked" is derived from the failure counter rather than stored. Every terminal
//! state requires requesting a new code.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ResetTokenId;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Active,
    Expired,
    Consumed,
}

impl TokenState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenState::Active => "active",
            TokenState::Expired => "expired",
            TokenState::Consumed => "consumed",
        }
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TokenState::Active),
            "expired" => Ok(TokenState::Expired),
            "consumed" => Ok(TokenState::Consumed),
            other => Err(ValidationError::InvalidField(format!(
                "Unknown token state: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetToken {
    pub id: ResetTokenId,
    /// Normalized email the code was issued for.
    pub email: String,
    /// PHC string; the plaintext code is never stored.
    #[serde(skip_serializing)]
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub failed_attempts: u32,
    pub state: TokenState,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_locked(&self, max_failed_attempts: u32) -> bool {
        self.failed_attempts >= max_failed_attempts
    }

    /// Active, unexpired and below the failure limit.
    pub fn is_actionable(&self, now: DateTime<Utc>, max_failed_attempts: u32) -> bool {
        self.state == TokenState::Active
            && !self.is_expired_at(now)
            && !self.is_locked(max_failed_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration, failed_attempts: u32, state: TokenState) -> ResetToken {
        let now = Utc::now();
        ResetToken {
            id: ResetTokenId::new_random(),
            email: "player@example.com".to_string(),
            otp_hash: "hash".to_string(),
            expires_at: now + expires_in,
            failed_attempts,
            state,
            last_attempt_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_actionable() {
        let now = Utc::now();
        assert!(token(Duration::minutes(10), 0, TokenState::Active).is_actionable(now, 5));
        assert!(token(Duration::minutes(10), 4, TokenState::Active).is_actionable(now, 5));
    }

    #[test]
    fn test_not_actionable() {
        let now = Utc::now();
        assert!(!token(Duration::minutes(10), 5, TokenState::Active).is_actionable(now, 5));
        assert!(!token(Duration::seconds(-1), 0, TokenState::Active).is_actionable(now, 5));
        assert!(!token(Duration::minutes(10), 0, TokenState::Consumed).is_actionable(now, 5));
        assert!(!token(Duration::minutes(10), 0, TokenState::Expired).is_actionable(now, 5));
    }

    #[test]
    fn test_state_round_trips_through_str() {
        for state in [TokenState::Active, TokenState::Expired, TokenState::Consumed] {
            assert_eq!(state.as_str().parse::<TokenState>().unwrap(), state);
        }
        assert!("used".parse::<TokenState>().is_err());
    }

    #[test]
    fn test_hash_is_not_serialized() {
        let json = serde_json::to_string(&token(Duration::minutes(1), 0, TokenState::Active))
            .unwrap();
        assert!(!json.contains("otp_hash"));
        assert!(json.contains("\"state\":\"active\""));
    }
}
