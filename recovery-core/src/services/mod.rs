//! Service layer for the reset protocol.
//!
//! Services hold their repositories behind `Arc`s and contain all protocol
//! decisions; repositories only persist.

pub mod account;
pub mod mailer;
pub mod password_reset;
pub mod rate_limit;
pub mod reaper;

pub use account::AccountService;
pub use mailer::OtpSender;
pub use password_reset::{PasswordResetService, TokenResolution, resolve_active_token};
pub use rate_limit::{RateLimitResult, RateLimiter, ResetRateLimiters, rate_limit_key};
pub use reaper::TokenReaper;

#[cfg(feature = "mailer")]
pub use mailer::MailerOtpSender;
