// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for per-user rate limiting

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What the limiter does when the counter store cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Admit the request and log a warning
    Open,
    /// Reject the request as service unavailable
    Closed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "fail-open" | "fail_open" => Ok(Self::Open),
            "closed" | "fail-closed" | "fail_closed" => Ok(Self::Closed),
            other => Err(format!("unknown rate limit failure policy: {}", other)),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Configuration for the fixed-window rate limiter
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window (default: 5)
    pub max_requests: u32,
    /// Window length (default: 60s)
    pub window: Duration,
    /// Behaviour when the counter store is unreachable (default: open)
    pub failure_policy: FailurePolicy,
    /// Prefix for counter keys, joined to the user id with ':'
    pub key_prefix: String,
    /// Redis connection URL; None selects the in-process store
    pub redis_url: Option<String>,
    /// Deadline for one counter store call, connect included (default: 1000ms)
    pub store_timeout: Duration,
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_requests: env::var("MAX_WINDOW_REQUEST_COUNT")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_requests),
            window: env::var("WINDOW_SIZE_IN_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
            failure_policy: env::var("RATE_LIMIT_FAILURE_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.failure_policy),
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            redis_url: redis_url_from_env(),
            store_timeout: env::var("RATE_LIMIT_STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests must be at least 1".to_string());
        }
        if self.window.is_zero() {
            return Err("window must be greater than 0".to_string());
        }
        if self.key_prefix.is_empty() {
            return Err("key_prefix cannot be empty".to_string());
        }
        if self.store_timeout.is_zero() {
            return Err("store_timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Counter key for a user identifier
    pub fn key_for(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix, identifier)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
            failure_policy: FailurePolicy::Open,
            key_prefix: "rate-limit".to_string(),
            redis_url: None,
            store_timeout: Duration::from_millis(1000),
        }
    }
}

/// `REDIS_URL` wins; otherwise a URL is assembled from `REDIS_HOST`,
/// `REDIS_PORT` and `REDIS_PASSWORD`.
fn redis_url_from_env() -> Option<String> {
    if let Ok(url) = env::var("REDIS_URL") {
        if !url.trim().is_empty() {
            return Some(url);
        }
    }

    let host = env::var("REDIS_HOST").ok().filter(|h| !h.trim().is_empty())?;
    let port = env::var("REDIS_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(6379);

    Some(match env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()) {
        Some(password) => format!("redis://:{}@{}:{}/", password, host, port),
        None => format!("redis://{}:{}/", host, port),
    })
}
