//! Degradation tests: the cache must behave as a pass-through when Redis is
//! unreachable, never as a source of errors.

use classification_cache::{
    compute_key, CacheConfig, CacheError, ClassificationCache, ClassificationResult, HealthStatus,
};
use std::time::{Duration, Instant};

/// Nothing listens on port 1, so connections are refused immediately
const UNREACHABLE: &str = "redis://127.0.0.1:1/0";

fn unreachable_cache() -> ClassificationCache {
    let config = CacheConfig::builder()
        .backing_store_location(UNREACHABLE)
        .operation_timeout(Duration::from_millis(500))
        .build();
    ClassificationCache::new(config).expect("construction must not require a live store")
}

#[tokio::test]
async fn test_get_returns_absent_when_unreachable() {
    let cache = unreachable_cache();

    for i in 0..3 {
        let key = compute_key(&format!("text {i}"), [("source", "doc1")]);
        assert_eq!(cache.get(&key).await, None);
    }

    let stats = cache.get_stats();
    assert_eq!(stats.errors, 3);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.hit_rate, 0.0);
}

#[tokio::test]
async fn test_set_returns_normally_when_unreachable() {
    let cache = unreachable_cache();
    let key = compute_key("Il ginocchio...", [("source", "doc1")]);

    let start = Instant::now();
    cache
        .set(&key, &ClassificationResult::new("orthopedics", 0.92), 604_800)
        .await;
    assert!(start.elapsed() < Duration::from_secs(2));

    let stats = cache.get_stats();
    assert_eq!(stats.write_errors, 1);
    assert_eq!(stats.writes, 0);
}

#[tokio::test]
async fn test_unroutable_host_is_bounded_by_timeout() {
    // TEST-NET-1 address: packets are dropped rather than refused
    let config = CacheConfig::builder()
        .backing_store_location("redis://192.0.2.1:6379/0")
        .operation_timeout(Duration::from_millis(200))
        .build();
    let cache = ClassificationCache::new(config).unwrap();
    let key = compute_key("Il ginocchio...", [("source", "doc1")]);

    let start = Instant::now();
    assert_eq!(cache.get(&key).await, None);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(cache.get_stats().errors, 1);
}

#[tokio::test]
async fn test_admin_operations_report_failure() {
    let cache = unreachable_cache();
    let key = compute_key("Il ginocchio...", [("source", "doc1")]);

    let err = cache.delete(&key).await.unwrap_err();
    assert!(err.is_recoverable());
    assert!(cache.clear().await.is_err());
    assert!(cache.inspect(&key).await.is_err());

    let health = cache.health_check().await;
    assert_eq!(health.status, HealthStatus::Unhealthy);
    assert!(health.error.is_some());
    assert_eq!(health.status.to_http_status_code(), 503);
}

#[test]
fn test_malformed_location_fails_fast() {
    let config = CacheConfig::builder()
        .backing_store_location("localhost:6379")
        .build();

    match ClassificationCache::new(config) {
        Err(CacheError::InvalidConfiguration(msg)) => {
            println!("Expected config error: {}", msg);
        }
        other => panic!("expected InvalidConfiguration, got {:?}", other.map(|_| ())),
    }
}
