//! # classification-cache
//!
//! Content-addressed cache for LLM document classification results, backed
//! by Redis.
//!
//! Document classification is the slowest step of ingestion. Identical
//! documents re-ingested within the TTL window are answered from Redis
//! instead, and a Redis outage only costs latency: lookups fall through to
//! the classifier and writes are dropped.
//!
//! ## Features
//!
//! - Deterministic SHA-256 keys over text + sorted metadata
//! - TTL-bounded entries (7 days by default) in a dedicated key namespace
//! - Hit/miss/error counters and p50/p95 latency for hits and classifier calls
//! - Bounded per-call timeouts and lazy, self-healing Redis connections
//! - Admin operations: inspect, purge by key, flush, health check
//! - Bypass mode (`enabled = false`) for rollback
//!
//! ## Cache-aside classification
//!
//! ```no_run
//! use async_trait::async_trait;
//! use classification_cache::{
//!     CacheConfig, CachedClassifier, ClassificationCache, ClassificationResult, Classifier,
//! };
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! struct LlmClassifier;
//!
//! #[async_trait]
//! impl Classifier for LlmClassifier {
//!     async fn classify(
//!         &self,
//!         _text: &str,
//!         _metadata: &HashMap<String, String>,
//!     ) -> anyhow::Result<ClassificationResult> {
//!         Ok(ClassificationResult::new("orthopedics", 0.92))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::builder()
//!         .backing_store_location("redis://localhost:6379/0")
//!         .build();
//!     let cache = Arc::new(ClassificationCache::new(config)?);
//!     let classifier = CachedClassifier::new(cache.clone(), LlmClassifier);
//!
//!     let metadata = HashMap::from([("source".to_string(), "doc1".to_string())]);
//!     let outcome = classifier.classify("Il ginocchio...", &metadata).await?;
//!     println!("{} (cached: {})", outcome.result.domain, outcome.from_cache);
//!     println!("{}", cache.get_stats());
//!     Ok(())
//! }
//! ```
//!
//! ## Admin operations
//!
//! ```no_run
//! use classification_cache::{CacheConfig, CacheKey, ClassificationCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = ClassificationCache::new(CacheConfig::from_env()?)?;
//!
//!     let key = CacheKey::parse("9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")?;
//!     if let Some(info) = cache.inspect(&key).await? {
//!         println!("{:?} expires in {:?}s", info.entry.value, info.remaining_ttl_seconds);
//!     }
//!     cache.delete(&key).await?;
//!
//!     let flushed = cache.clear().await?;
//!     println!("Flushed {} entries", flushed);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod classification;
pub mod connection;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    compute_key, BackingStore, CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey,
    CacheMetrics, CacheStats, ClassificationCache, EntryInfo, LatencySummary, MemoryStore,
};
pub use classification::{
    CachedClassifier, ClassificationOutcome, ClassificationResult, Classifier,
};
pub use connection::{HealthCheckResult, HealthStatus, RedisStore};
pub use error::{CacheError, Result};
