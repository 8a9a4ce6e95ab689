// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::support::UnreachableStore;
use chat_gateway::rate_limit::{
    CounterStore, FailurePolicy, InMemoryCounterStore, RateLimitConfig, RateLimitError,
    RateLimiter, RedisCounterStore,
};
use std::sync::Arc;
use std::time::Duration;

fn limiter_with(store: Arc<dyn CounterStore>, max_requests: u32, window: Duration) -> RateLimiter {
    let config = RateLimitConfig {
        max_requests,
        window,
        ..RateLimitConfig::default()
    };
    RateLimiter::new(store, config)
}

#[tokio::test]
async fn test_limit_then_denial_in_same_window() {
    let limiter = limiter_with(
        Arc::new(InMemoryCounterStore::new()),
        5,
        Duration::from_secs(60),
    );

    for _ in 0..5 {
        assert!(limiter.admit("user_123").await.unwrap().allowed);
    }
    let denied = limiter.admit("user_123").await.unwrap();
    assert!(!denied.allowed);
    assert!(denied.reset_after <= Duration::from_secs(60));
}

#[tokio::test]
async fn test_window_expiry_resets_admission() {
    let limiter = limiter_with(
        Arc::new(InMemoryCounterStore::new()),
        2,
        Duration::from_millis(150),
    );

    assert!(limiter.admit("user_123").await.unwrap().allowed);
    assert!(limiter.admit("user_123").await.unwrap().allowed);
    assert!(!limiter.admit("user_123").await.unwrap().allowed);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let admission = limiter.admit("user_123").await.unwrap();
    assert!(admission.allowed);
    assert_eq!(admission.count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_exceed_limit() {
    let max_requests = 5;
    let limiter = Arc::new(limiter_with(
        Arc::new(InMemoryCounterStore::new()),
        max_requests,
        Duration::from_secs(60),
    ));

    let handles: Vec<_> = (0..max_requests * 2)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.admit("shared-user").await.unwrap().allowed })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, max_requests);
}

#[tokio::test]
async fn test_fail_closed_rejects_when_store_down() {
    let config = RateLimitConfig {
        failure_policy: FailurePolicy::Closed,
        ..RateLimitConfig::default()
    };
    let limiter = RateLimiter::new(Arc::new(UnreachableStore), config);

    let result = limiter.admit("user_123").await;
    assert!(matches!(result, Err(RateLimitError::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_fail_open_admits_when_store_down() {
    let limiter = RateLimiter::new(Arc::new(UnreachableStore), RateLimitConfig::default());

    let admission = limiter.admit("user_123").await.unwrap();
    assert!(admission.allowed);
    assert!(admission.degraded);
}

#[tokio::test]
async fn test_silent_redis_degrades_under_open_policy() {
    // Accepts connections (via the backlog) but never answers
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("redis://{}/", addr);

    let config = RateLimitConfig {
        store_timeout: Duration::from_millis(200),
        ..RateLimitConfig::default()
    };
    let limiter = RateLimiter::new(Arc::new(RedisCounterStore::new(&url).unwrap()), config);

    let started = std::time::Instant::now();
    let admission = limiter.admit("user_123").await.unwrap();

    assert!(admission.allowed);
    assert!(admission.degraded);
    assert!(!limiter.store_healthy().await);
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(listener);
}

#[tokio::test]
async fn test_silent_redis_rejects_under_closed_policy() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("redis://{}/", addr);

    let config = RateLimitConfig {
        failure_policy: FailurePolicy::Closed,
        store_timeout: Duration::from_millis(200),
        ..RateLimitConfig::default()
    };
    let limiter = RateLimiter::new(Arc::new(RedisCounterStore::new(&url).unwrap()), config);

    let started = std::time::Instant::now();
    let result = limiter.admit("user_123").await;

    assert!(matches!(result, Err(RateLimitError::StoreUnavailable(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(listener);
}

// The tests below need a running Redis:
//   REDIS_URL=redis://127.0.0.1:6379/ cargo test --test gateway_tests -- --ignored

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string())
}

async fn redis_pttl(key: &str) -> i64 {
    let client = redis::Client::open(redis_url()).unwrap();
    let mut connection = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("PTTL")
        .arg(key)
        .query_async::<_, i64>(&mut connection)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running Redis (REDIS_URL)"]
async fn test_redis_first_hit_arms_window_and_later_hits_keep_it() {
    let store = RedisCounterStore::new(&redis_url()).unwrap();
    let key = format!("rate-limit-test:{}", uuid::Uuid::new_v4());
    let window = Duration::from_secs(10);

    let first = store.increment_and_expire(&key, window).await.unwrap();
    assert_eq!(first.count, 1);
    assert_eq!(first.ttl, window);
    let armed = redis_pttl(&key).await;
    assert!(armed > 0 && armed <= 10_000);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let second = store.increment_and_expire(&key, window).await.unwrap();
    assert_eq!(second.count, 2);
    assert!(second.ttl < window);
    assert!(second.ttl <= Duration::from_millis(9_800));
    assert!(redis_pttl(&key).await <= 9_800);
}

#[tokio::test]
#[ignore = "requires a running Redis (REDIS_URL)"]
async fn test_redis_key_without_ttl_is_rearmed() {
    let store = RedisCounterStore::new(&redis_url()).unwrap();
    let key = format!("rate-limit-test:{}", uuid::Uuid::new_v4());
    let window = Duration::from_secs(10);

    let client = redis::Client::open(redis_url()).unwrap();
    let mut connection = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("SET")
        .arg(&key)
        .arg(5)
        .query_async::<_, ()>(&mut connection)
        .await
        .unwrap();
    assert_eq!(redis_pttl(&key).await, -1);

    let snapshot = store.increment_and_expire(&key, window).await.unwrap();
    assert_eq!(snapshot.count, 6);
    assert_eq!(snapshot.ttl, window);
    let rearmed = redis_pttl(&key).await;
    assert!(rearmed > 0 && rearmed <= 10_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a running Redis (REDIS_URL)"]
async fn test_redis_store_enforces_limit_across_clients() {
    let url = redis_url();
    let key_prefix = format!("rate-limit-test-{}", uuid::Uuid::new_v4());
    let config = RateLimitConfig {
        max_requests: 3,
        window: Duration::from_secs(5),
        key_prefix,
        ..RateLimitConfig::default()
    };

    // Two gateway instances sharing one store
    let first = Arc::new(RateLimiter::new(
        Arc::new(RedisCounterStore::new(&url).unwrap()),
        config.clone(),
    ));
    let second = Arc::new(RateLimiter::new(
        Arc::new(RedisCounterStore::new(&url).unwrap()),
        config,
    ));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let limiter = if i % 2 == 0 {
                first.clone()
            } else {
                second.clone()
            };
            tokio::spawn(async move { limiter.admit("redis-user").await.unwrap() })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        let admission = handle.await.unwrap();
        assert!(!admission.degraded);
        if admission.allowed {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 3);

    let denied = first.admit("redis-user").await.unwrap();
    assert!(!denied.allowed);
    assert!(denied.reset_after <= Duration::from_secs(5));
    assert!(first.store_healthy().await);
}
