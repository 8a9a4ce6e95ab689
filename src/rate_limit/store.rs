// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Counter stores backing the rate limiter
//!
//! A store exposes exactly one mutation: increment a key and arm its expiry
//! in a single indivisible step. Stores never offer a separate read, so a
//! caller cannot build a read-then-write race on top of them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Counter state observed right after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Post-increment count for the current window
    pub count: u64,
    /// Time until the window expires
    pub ttl: Duration,
}

/// Counter store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Counter store connection error: {0}")]
    Connection(String),

    #[error("Counter store command failed: {0}")]
    Command(String),
}

/// Shared, atomically mutated counter store
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key` and, when it is new or has no expiry, arm a
    /// `window` expiry. Both happen as one atomic operation.
    async fn increment_and_expire(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<CounterSnapshot, StoreError>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Sweep expired records once the map grows past this many entries
const SWEEP_THRESHOLD: usize = 10_000;

struct CounterRecord {
    count: u64,
    expires_at: Instant,
}

/// In-process counter store
///
/// Only atomic within one process. Multi-instance deployments must use
/// [`super::RedisCounterStore`].
pub struct InMemoryCounterStore {
    records: Mutex<HashMap<String, CounterRecord>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) counters
    pub fn live_keys(&self) -> usize {
        let now = Instant::now();
        self.records
            .lock()
            .map(|records| records.values().filter(|r| r.expires_at > now).count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_and_expire(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<CounterSnapshot, StoreError> {
        let now = Instant::now();
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::Command("counter map lock poisoned".to_string()))?;

        if records.len() >= SWEEP_THRESHOLD {
            records.retain(|_, record| record.expires_at > now);
        }

        let record = records.entry(key.to_string()).or_insert(CounterRecord {
            count: 0,
            expires_at: now + window,
        });

        // Expired window: start a fresh one
        if record.expires_at <= now {
            record.count = 0;
            record.expires_at = now + window;
        }

        record.count += 1;

        Ok(CounterSnapshot {
            count: record.count,
            ttl: record.expires_at.saturating_duration_since(now),
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
