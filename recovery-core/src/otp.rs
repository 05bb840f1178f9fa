//! One-time code generation and hashing.
//!
//! Codes are six symbols from `A-Z0-9` drawn from the operating system RNG.
//! Only a salted argon2 hash of a code is ever stored; hashing and verification
//! run on the blocking pool because argon2 is deliberately slow.

use rand::{TryRngCore, rngs::OsRng};

use crate::error::{CryptoError, Error};

pub const OTP_LENGTH: usize = 6;
pub const OTP_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a fresh code.
pub fn generate_otp() -> String {
    let len = OTP_ALPHABET.len() as u32;
    // Largest multiple of the alphabet size that fits in a u32; rejecting values
    // above it keeps every symbol equally likely.
    let zone = u32::MAX - (u32::MAX % len);

    let mut code = String::with_capacity(OTP_LENGTH);
    while code.len() < OTP_LENGTH {
        let value = OsRng
            .try_next_u32()
            .expect("OS RNG failure - system entropy source unavailable");
        if value < zone {
            code.push(OTP_ALPHABET[(value % len) as usize] as char);
        }
    }
    code
}

/// Hashes a normalized code into a PHC string.
pub async fn hash_otp(otp: &str) -> Result<String, Error> {
    let otp = otp.to_string();
    tokio::task::spawn_blocking(move || password_auth::generate_hash(otp))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "OTP hashing task failed");
            Error::Crypto(CryptoError::Hash(e.to_string()))
        })
}

/// Checks a normalized code against a stored hash. A malformed hash is a mismatch.
pub async fn verify_otp(otp: &str, hash: &str) -> Result<bool, Error> {
    let otp = otp.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || password_auth::verify_password(otp, &hash).is_ok())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "OTP verification task failed");
            Error::Crypto(CryptoError::Hash(e.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_otp_shape() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.bytes().all(|b| OTP_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generate_otp_varies() {
        let codes: HashSet<String> = (0..50).map(|_| generate_otp()).collect();
        assert!(codes.len() > 45);
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_otp("X7K2P9").await.unwrap();

        assert_ne!(hash, "X7K2P9");
        assert!(verify_otp("X7K2P9", &hash).await.unwrap());
        assert!(!verify_otp("X7K2P8", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let first = hash_otp("AAAAAA").await.unwrap();
        let second = hash_otp("AAAAAA").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_verify_against_garbage_hash() {
        assert!(!verify_otp("X7K2P9", "not-a-phc-string").await.unwrap());
    }
}
