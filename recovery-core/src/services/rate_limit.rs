//! In-memory sliding-window rate limiting.
//!
//! Each limiter keeps, per identity, the timestamps of the requests it allowed
//! inside the current window. State is local to the limiter instance; nothing is
//! shared between processes.

use std::collections::VecDeque;
use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::validation::normalize_email;

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed {
        /// Requests left in the window after this one.
        remaining: u32,
    },
    Limited {
        /// Time until the oldest counted request leaves the window.
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Sliding-window limiter keyed by caller identity.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    hits: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counts a request for `key` unless the window is already full.
    pub fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Utc::now())
    }

    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed {
                remaining: u32::MAX,
            };
        }

        let window_start = now - self.config.window;
        let mut hits = self.hits.entry(key.to_string()).or_default();
        while hits.front().is_some_and(|at| *at <= window_start) {
            hits.pop_front();
        }

        let count = hits.len() as u32;
        if count >= self.config.max_requests {
            let retry_after = hits
                .front()
                .map(|oldest| *oldest + self.config.window - now)
                .unwrap_or(self.config.window);
            return RateLimitResult::Limited {
                retry_after: retry_after.max(Duration::seconds(1)),
            };
        }

        hits.push_back(now);
        RateLimitResult::Allowed {
            remaining: self.config.max_requests - count - 1,
        }
    }

    /// Drops identities with no request inside the window. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.prune_at(Utc::now())
    }

    pub fn prune_at(&self, now: DateTime<Utc>) -> usize {
        let window_start = now - self.config.window;
        let before = self.hits.len();
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|at| *at > window_start));
        before.saturating_sub(self.hits.len())
    }

    /// Number of identities currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.hits.len()
    }
}

/// The identity a request is limited under: the normalized email when one was
/// supplied, otherwise the client address.
pub fn rate_limit_key(email: &str, client_ip: Option<IpAddr>) -> String {
    let email = normalize_email(email);
    if !email.is_empty() {
        return email;
    }

    match client_ip {
        Some(ip) => format!("ip:{ip}"),
        None => "ip:unknown".to_string(),
    }
}

/// One limiter per reset endpoint.
#[derive(Debug)]
pub struct ResetRateLimiters {
    pub request_otp: RateLimiter,
    pub verify_otp: RateLimiter,
    pub reset_password: RateLimiter,
}

impl ResetRateLimiters {
    pub fn new(
        request_otp: RateLimitConfig,
        verify_otp: RateLimitConfig,
        reset_password: RateLimitConfig,
    ) -> Self {
        Self {
            request_otp: RateLimiter::new(request_otp),
            verify_otp: RateLimiter::new(verify_otp),
            reset_password: RateLimiter::new(reset_password),
        }
    }

    pub fn prune(&self) -> usize {
        self.request_otp.prune() + self.verify_otp.prune() + self.reset_password.prune()
    }
}
