// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-user request rate limiting
//!
//! Each request increments a counter keyed by the caller's user id inside
//! a fixed window. The counter lives in a store shared by all gateway
//! instances (Redis) or, for single-instance setups, in process memory.
//!
//! Key features:
//! - One atomic increment-and-expire per request, no read-then-write
//! - Fixed window: the timer is armed by the first request only
//! - Explicit fail-open / fail-closed policy for store outages

pub mod config;
pub mod limiter;
pub mod redis_store;
pub mod store;

pub use config::{FailurePolicy, RateLimitConfig};
pub use limiter::{Admission, RateLimitError, RateLimiter};
pub use redis_store::RedisCounterStore;
pub use store::{CounterSnapshot, CounterStore, InMemoryCounterStore, StoreError};
