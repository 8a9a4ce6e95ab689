// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fixed-window per-user rate limiter

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::{FailurePolicy, RateLimitConfig};
use super::store::{CounterSnapshot, CounterStore, StoreError};

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Post-increment count in the current window (0 when degraded)
    pub count: u64,
    /// Configured maximum per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the window resets
    pub reset_after: Duration,
    /// True when the store was unreachable and the open policy admitted
    pub degraded: bool,
}

/// Rate limiter errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Counter store unreachable under the closed failure policy
    #[error("Rate limit store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Per-identifier rate limiter over a shared counter store
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Count one request for `identifier` and decide admission
    ///
    /// Allowed iff the post-increment count is within `max_requests`.
    /// Store failures follow the configured [`FailurePolicy`].
    pub async fn admit(&self, identifier: &str) -> Result<Admission, RateLimitError> {
        let key = self.config.key_for(identifier);
        let limit = self.config.max_requests;

        match self.bounded_increment(&key).await {
            Ok(snapshot) => {
                let allowed = snapshot.count <= u64::from(limit);
                let remaining = u64::from(limit).saturating_sub(snapshot.count) as u32;

                if !allowed {
                    debug!(
                        "Rate limit exceeded for {}: {}/{} (resets in {:?})",
                        identifier, snapshot.count, limit, snapshot.ttl
                    );
                }

                Ok(Admission {
                    allowed,
                    count: snapshot.count,
                    limit,
                    remaining,
                    reset_after: snapshot.ttl,
                    degraded: false,
                })
            }
            Err(e) => match self.config.failure_policy {
                FailurePolicy::Open => {
                    warn!(
                        "Counter store '{}' unavailable, admitting {} (fail open): {}",
                        self.store.name(),
                        identifier,
                        e
                    );
                    Ok(Admission {
                        allowed: true,
                        count: 0,
                        limit,
                        remaining: limit,
                        reset_after: self.config.window,
                        degraded: true,
                    })
                }
                FailurePolicy::Closed => {
                    warn!(
                        "Counter store '{}' unavailable, rejecting {} (fail closed): {}",
                        self.store.name(),
                        identifier,
                        e
                    );
                    Err(RateLimitError::StoreUnavailable(e.to_string()))
                }
            },
        }
    }

    async fn bounded_increment(&self, key: &str) -> Result<CounterSnapshot, StoreError> {
        let call = self.store.increment_and_expire(key, self.config.window);
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .unwrap_or_else(|_| Err(self.timed_out()))
    }

    fn timed_out(&self) -> StoreError {
        StoreError::Connection(format!(
            "no reply within {}ms",
            self.config.store_timeout.as_millis()
        ))
    }

    /// Check the backing store
    pub async fn store_healthy(&self) -> bool {
        matches!(
            tokio::time::timeout(self.config.store_timeout, self.store.ping()).await,
            Ok(Ok(()))
        )
    }

    /// Name of the backing store
    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
