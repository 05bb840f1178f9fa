//! Input normalization and structural checks shared by every reset operation.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

use crate::otp::{OTP_ALPHABET, OTP_LENGTH};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("Invalid email regex pattern")
});

const MAX_EMAIL_LENGTH: usize = 254;

/// Trims surrounding whitespace and lower-cases. Every lookup and rate-limit key
/// uses this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates an already normalized email address.
///
/// ```rust
/// use recovery_core::validation::validate_email;
///
/// assert!(validate_email("player@example.com").is_ok());
/// assert!(validate_email("not-an-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required.".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Email format is invalid.".to_string(),
        ));
    }

    Ok(())
}

/// Trims and upper-cases a submitted code so comparison is case-insensitive.
pub fn normalize_otp(otp: &str) -> String {
    otp.trim().to_uppercase()
}

/// True when a normalized code has the issued length and alphabet.
pub fn is_well_formed_otp(otp: &str) -> bool {
    otp.len() == OTP_LENGTH && otp.bytes().all(|b| OTP_ALPHABET.contains(&b))
}

/// Checks the trimmed length of a new password.
pub fn validate_new_password(password: &str, min_length: usize) -> Result<(), ValidationError> {
    if password.trim().chars().count() < min_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {min_length} characters."
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Player@Example.COM "), "player@example.com");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("player@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.co").is_ok());
    }

    #[test]
    fn test_validate_email_missing() {
        match validate_email("") {
            Err(ValidationError::MissingField(msg)) => assert_eq!(msg, "Email is required."),
            other => panic!("Expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_email_invalid() {
        for email in ["player", "player@", "@example.com", "player@example", "a b@example.com"] {
            match validate_email(email) {
                Err(ValidationError::InvalidEmail(msg)) => {
                    assert_eq!(msg, "Email format is invalid.")
                }
                other => panic!("Expected invalid email for {email}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            validate_email(&email),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_otp_normalization() {
        assert_eq!(normalize_otp(" x7k2p9 "), "X7K2P9");
        assert!(is_well_formed_otp(&normalize_otp("x7k2p9")));
    }

    #[test]
    fn test_malformed_otp() {
        assert!(!is_well_formed_otp(""));
        assert!(!is_well_formed_otp("X7K2P"));
        assert!(!is_well_formed_otp("X7K2P9Q"));
        assert!(!is_well_formed_otp("X7K-P9"));
        assert!(!is_well_formed_otp("x7k2p9"));
    }

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("longenough", 8).is_ok());
        assert!(validate_new_password("12345678", 8).is_ok());

        match validate_new_password("short", 8) {
            Err(ValidationError::InvalidPassword(msg)) => {
                assert_eq!(msg, "Password must be at least 8 characters.")
            }
            other => panic!("Expected invalid password, got {other:?}"),
        }

        // surrounding whitespace does not count
        assert!(validate_new_password("   abc    ", 8).is_err());
    }
}
