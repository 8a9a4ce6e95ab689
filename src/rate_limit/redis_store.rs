// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Redis-backed counter store shared by every gateway instance

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::store::{CounterSnapshot, CounterStore, StoreError};

/// INCR and PEXPIRE in one server-side script. Redis runs scripts without
/// interleaving other commands, so concurrent callers always observe
/// distinct post-increment counts. The expiry is armed on the first hit
/// of a window, or when a key somehow lost its TTL, and left alone
/// otherwise (fixed window).
const INCREMENT_AND_EXPIRE: &str = r#"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if count == 1 or ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

/// Counter store backed by Redis
///
/// The connection is opened on first use and reused afterwards. A failed
/// or abandoned connect leaves the store unconnected, so the next call
/// tries again.
pub struct RedisCounterStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    script: Script,
}

impl RedisCounterStore {
    /// Create a store for `url` without connecting
    ///
    /// # Arguments
    /// * `url` - Redis URL, e.g. `redis://127.0.0.1:6379/`
    pub fn new(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            script: Script::new(INCREMENT_AND_EXPIRE),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
                info!("Connected to Redis counter store");
                Ok::<_, StoreError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment_and_expire(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<CounterSnapshot, StoreError> {
        let mut connection = self.connection().await?;
        let window_ms = window.as_millis().max(1) as u64;

        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(key)
            .arg(window_ms)
            .invoke_async(&mut connection)
            .await
            .map_err(map_redis_error)?;

        debug!("Counter {} = {} (ttl {}ms)", key, count, ttl_ms);

        Ok(CounterSnapshot {
            count: count.max(0) as u64,
            ttl: Duration::from_millis(ttl_ms.max(0) as u64),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut connection = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn map_redis_error(e: redis::RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}
