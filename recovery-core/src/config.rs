//! Tunables for the reset protocol, read from the environment.

use std::str::FromStr;

use chrono::Duration;

/// Longest duration accepted from the environment: one year.
const MAX_DURATION_SECONDS: i64 = 365 * 24 * 60 * 60;

/// Settings for one sliding-window limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per identity inside the window.
    pub max_requests: u32,
    pub window: Duration,
    /// When false every request is allowed.
    pub enabled: bool,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            max_requests: 0,
            window: Duration::zero(),
            enabled: false,
        }
    }
}

/// Configuration for the password reset service.
#[derive(Debug, Clone)]
pub struct ResetConfig {
    /// Lifetime of an issued code.
    /// Default: 10 minutes
    pub otp_expiration: Duration,

    /// Minimum age of the active token before a new code can be requested.
    ///
    /// The SQLite backend stores timestamps in whole seconds, so both this window
    /// and `otp_expiration` may end up to one second early there.
    /// Default: 60 seconds
    pub resend_cooldown: Duration,

    /// Wrong submissions allowed before the token locks.
    /// Default: 5
    pub max_failed_attempts: u32,

    /// Minimum trimmed length of a new password.
    /// Default: 8
    pub password_min_length: usize,

    /// When true, request-otp reports unregistered emails with a dedicated error.
    /// When false it answers with the generic success message instead.
    /// Default: true
    pub disclose_unknown_accounts: bool,

    /// Default: 5 per 15 minutes
    pub request_otp_limit: RateLimitConfig,

    /// Default: 10 per 15 minutes
    pub verify_otp_limit: RateLimitConfig,

    /// Default: 10 per 15 minutes
    pub reset_password_limit: RateLimitConfig,

    /// Period of the expired-token reaper.
    /// Default: 60 seconds
    pub cleanup_interval: std::time::Duration,
}

impl Default for ResetConfig {
    fn default() -> Self {
        let window = Duration::minutes(15);
        Self {
            otp_expiration: Duration::minutes(10),
            resend_cooldown: Duration::seconds(60),
            max_failed_attempts: 5,
            password_min_length: 8,
            disclose_unknown_accounts: true,
            request_otp_limit: RateLimitConfig::new(5, window),
            verify_otp_limit: RateLimitConfig::new(10, window),
            reset_password_limit: RateLimitConfig::new(10, window),
            cleanup_interval: std::time::Duration::from_secs(60),
        }
    }
}

impl ResetConfig {
    /// Builds a configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let minutes = |key: &str, default: Duration| duration_or(&lookup, key, default, 60);
        let seconds = |key: &str, default: Duration| duration_or(&lookup, key, default, 1);

        let window = seconds("RATE_LIMIT_WINDOW_SECONDS", defaults.request_otp_limit.window);
        let limit = |key: &str, default: &RateLimitConfig| {
            let max = parse_or(&lookup, key, default.max_requests);
            RateLimitConfig::new(max, window)
        };

        Self {
            otp_expiration: minutes("OTP_EXPIRATION_MINUTES", defaults.otp_expiration),
            resend_cooldown: seconds("OTP_RESEND_COOLDOWN_SECONDS", defaults.resend_cooldown),
            max_failed_attempts: parse_or(
                &lookup,
                "OTP_MAX_FAILED_ATTEMPTS",
                defaults.max_failed_attempts,
            ),
            password_min_length: parse_or(
                &lookup,
                "RESET_PASSWORD_MIN_LENGTH",
                defaults.password_min_length,
            ),
            disclose_unknown_accounts: defaults.disclose_unknown_accounts,
            request_otp_limit: limit("REQUEST_OTP_RATE_LIMIT", &defaults.request_otp_limit),
            verify_otp_limit: limit("VERIFY_OTP_RATE_LIMIT", &defaults.verify_otp_limit),
            reset_password_limit: limit(
                "RESET_PASSWORD_RATE_LIMIT",
                &defaults.reset_password_limit,
            ),
            cleanup_interval: seconds(
                "OTP_CLEANUP_INTERVAL_SECONDS",
                Duration::seconds(defaults.cleanup_interval.as_secs() as i64),
            )
            .to_std()
            .unwrap_or(defaults.cleanup_interval),
        }
    }

    pub fn with_otp_expiration(mut self, expiration: Duration) -> Self {
        self.otp_expiration = expiration;
        self
    }

    pub fn with_resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.resend_cooldown = cooldown;
        self
    }

    pub fn with_max_failed_attempts(mut self, max: u32) -> Self {
        self.max_failed_attempts = max;
        self
    }

    pub fn with_disclose_unknown_accounts(mut self, disclose: bool) -> Self {
        self.disclose_unknown_accounts = disclose;
        self
    }

    /// Turns off all three endpoint limiters.
    pub fn without_rate_limits(mut self) -> Self {
        self.request_otp_limit = RateLimitConfig::disabled();
        self.verify_otp_limit = RateLimitConfig::disabled();
        self.reset_password_limit = RateLimitConfig::disabled();
        self
    }
}

/// Positive numeric setting, or the default with a warning.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            tracing::warn!(key, value = %raw, default = %default, "Ignoring invalid configuration value");
            default
        }
    }
}

/// Positive duration counted in units of `unit_seconds`, at most one year.
fn duration_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
    unit_seconds: i64,
) -> Duration {
    let units = parse_or(lookup, key, default.num_seconds() / unit_seconds);
    match units.checked_mul(unit_seconds) {
        Some(total) if total <= MAX_DURATION_SECONDS => Duration::seconds(total),
        _ => {
            tracing::warn!(
                key,
                value = units,
                default_seconds = default.num_seconds(),
                "Ignoring out-of-range duration"
            );
            default
        }
    }
}
