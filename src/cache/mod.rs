//! # Classification Result Cache
//!
//! A content-addressed cache in front of the LLM classification call.
//!
//! ## Features
//!
//! - **Content addressing**: keys are SHA-256 digests of the document text and
//!   its sorted metadata, so identical documents always share an entry
//! - **TTL expiry**: delegated to the backing store (`SET ... EX`)
//! - **Graceful degradation**: store failures and timeouts turn into misses
//!   and dropped writes, never into errors for the caller
//! - **Metrics**: hit/miss/error counters and p50/p95 latency per outcome
//! - **Admin operations**: inspect, purge by key, flush the namespace
//!
//! ## Example
//!
//! ```rust
//! use classification_cache::cache::{CacheConfig, ClassificationCache, MemoryStore};
//! use classification_cache::ClassificationResult;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::builder().ttl_seconds(3600).build();
//! let cache = ClassificationCache::with_store(config, Arc::new(MemoryStore::new()))?;
//!
//! let key = cache.compute_key("Il ginocchio...", [("source", "doc1")]);
//! cache
//!     .set(&key, &ClassificationResult::new("orthopedics", 0.92), 3600)
//!     .await;
//!
//! if let Some(result) = cache.get(&key).await {
//!     println!("Cache hit: {}", result.domain);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod entry;
pub mod key;
pub mod metrics;
pub mod store;
pub mod types;

pub use backend::{BackingStore, MemoryStore};
pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_TTL_SECONDS};
pub use entry::{CacheEntry, EntryInfo};
pub use key::compute_key;
pub use metrics::CacheMetrics;
pub use store::ClassificationCache;
pub use types::{CacheKey, CacheStats, LatencySummary};
