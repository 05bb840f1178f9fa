//! Core of the OTP password reset service.
//!
//! This crate holds the protocol itself, independent of storage and transport:
//!
//! - [`ResetToken`] and [`TokenState`], the persisted state of one reset attempt
//! - [`repositories`], the traits a storage backend implements
//! - [`services::PasswordResetService`], which runs request-otp, verify-otp and
//!   reset-password on top of those traits
//! - [`services::RateLimiter`], the per-identity sliding-window limiter
//! - [`otp`], code generation and hashing
//!
//! Storage backends and HTTP integrations live in their own crates and depend on
//! this one.
pub mod account;
pub mod config;
pub mod error;
pub mod id;
pub mod otp;
pub mod repositories;
pub mod reset_token;
pub mod services;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use account::Account;
pub use config::{RateLimitConfig, ResetConfig};
pub use error::{Error, ResetError};
pub use id::{AccountId, ResetTokenId};
pub use repositories::{
    AccountRepository, AccountRepositoryProvider, RepositoryProvider, ResetTokenRepository,
    ResetTokenRepositoryProvider,
};
pub use reset_token::{ResetToken, TokenState};
pub use services::{AccountService, OtpSender, PasswordResetService, TokenReaper};
pub use storage::{NewAccount, NewResetToken};
