//! The classification cache: a thin, fault-absorbing client over a
//! [`BackingStore`]

use crate::cache::{
    backend::BackingStore,
    config::CacheConfig,
    entry::{CacheEntry, EntryInfo},
    key::compute_key,
    metrics::CacheMetrics,
    types::{CacheKey, CacheStats},
};
use crate::classification::ClassificationResult;
use crate::connection::{HealthCheckResult, RedisStore};
use crate::error::{CacheError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Keys requested per SCAN round-trip during `clear`/`entry_count`
const SCAN_PAGE_SIZE: usize = 500;

/// Keys removed per DEL round-trip during `clear`
const DELETE_BATCH_SIZE: usize = 500;

/// Content-addressed cache for classification results
///
/// - `get` and `set` never fail: store errors become misses or dropped
///   writes and are counted separately in the metrics
/// - every store call is bounded by `operation_timeout`
/// - nothing is kept in process memory except metrics
/// - `enabled = false` or no backing store turns the cache into a pass-through
pub struct ClassificationCache {
    config: CacheConfig,
    store: Option<Arc<dyn BackingStore>>,
    metrics: CacheMetrics,
}

impl ClassificationCache {
    /// Create a cache from configuration, connecting to Redis lazily if a
    /// location is configured.
    ///
    /// Fails only on invalid configuration.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let store: Option<Arc<dyn BackingStore>> = match &config.backing_store_location {
            Some(location) => Some(Arc::new(RedisStore::open(location)?)),
            None => {
                warn!("No backing store configured; classification cache runs as pass-through");
                None
            }
        };

        Ok(Self::build(config, store))
    }

    /// Create a cache over an explicit store (e.g. [`MemoryStore`](crate::MemoryStore))
    pub fn with_store(config: CacheConfig, store: Arc<dyn BackingStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Some(store)))
    }

    fn build(config: CacheConfig, store: Option<Arc<dyn BackingStore>>) -> Self {
        info!(
            "Initializing classification cache (enabled: {}, ttl: {}s, namespace: {}, backend: {})",
            config.enabled,
            config.ttl_seconds,
            config.namespace,
            store.as_ref().map(|s| s.name()).unwrap_or("none")
        );

        Self {
            metrics: CacheMetrics::new(config.latency_window),
            config,
            store,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether lookups and writes reach a backing store
    pub fn is_active(&self) -> bool {
        self.config.enabled && self.store.is_some()
    }

    /// Compute the key for a document; see [`compute_key`]
    pub fn compute_key<I, K, V>(&self, text: &str, metadata: I) -> CacheKey
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        compute_key(text, metadata)
    }

    /// Look up a cached classification.
    ///
    /// Returns `None` on a miss, when bypassed, and when the store fails.
    /// Failures are counted as errors rather than misses.
    pub async fn get(&self, key: &CacheKey) -> Option<ClassificationResult> {
        let store = match self.active_store() {
            Some(store) => store,
            None => {
                self.metrics.record_miss();
                return None;
            }
        };

        let store_key = key.namespaced(&self.config.namespace);
        let start = Instant::now();

        let lookup = self
            .bounded("GET", store.get(&store_key))
            .await
            .and_then(|raw| raw.map(|v| decode_entry(key, &v)).transpose());

        match lookup {
            Ok(Some(entry)) => {
                let elapsed = start.elapsed();
                self.metrics.record_hit(elapsed);
                debug!(
                    "Cache hit: {} ({:.2}ms)",
                    key.short(),
                    elapsed.as_secs_f64() * 1000.0
                );
                Some(entry.value)
            }
            Ok(None) => {
                self.metrics.record_miss();
                debug!("Cache miss: {}", key.short());
                None
            }
            Err(e) => {
                self.metrics.record_error();
                warn!(
                    error.kind = e.kind(),
                    "Cache lookup failed for {}, continuing uncached: {}",
                    key.short(),
                    e
                );
                None
            }
        }
    }

    /// Store a classification under `key` for `ttl_seconds`.
    ///
    /// Never fails: store errors, a zero TTL and a non-finite confidence are
    /// logged and counted as write errors, and nothing is stored.
    pub async fn set(&self, key: &CacheKey, value: &ClassificationResult, ttl_seconds: u64) {
        let store = match self.active_store() {
            Some(store) => store,
            None => return,
        };

        if ttl_seconds == 0 {
            self.metrics.record_write_error();
            warn!("Refusing to cache {} with a zero TTL", key.short());
            return;
        }

        // JSON has no NaN or infinity; such an entry would never decode
        if !value.confidence.is_finite() {
            self.metrics.record_write_error();
            warn!(
                "Refusing to cache {} with non-finite confidence {}",
                key.short(),
                value.confidence
            );
            return;
        }

        let store_key = key.namespaced(&self.config.namespace);
        let entry = CacheEntry::new(key.clone(), value.clone(), ttl_seconds);

        let write = match entry.to_cache_value() {
            Ok(encoded) => {
                self.bounded("SET", store.set_ex(&store_key, &encoded, ttl_seconds))
                    .await
            }
            Err(e) => Err(e),
        };

        match write {
            Ok(()) => {
                self.metrics.record_write();
                debug!("Cached {} for {}s", key.short(), ttl_seconds);
            }
            Err(e) => {
                self.metrics.record_write_error();
                warn!(
                    error.kind = e.kind(),
                    "Cache write failed for {}, result not cached: {}",
                    key.short(),
                    e
                );
            }
        }
    }

    /// Store with the configured default TTL
    pub async fn set_with_default_ttl(&self, key: &CacheKey, value: &ClassificationResult) {
        self.set(key, value, self.config.ttl_seconds).await
    }

    /// Purge a single entry. Returns whether an entry was removed; a missing
    /// key is not an error.
    pub async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let Some(store) = self.store.as_ref() else {
            return Ok(false);
        };

        let store_key = key.namespaced(&self.config.namespace);
        let removed = self.bounded("DEL", store.delete(&store_key)).await?;

        if removed {
            info!("Purged cache entry {}", key);
        } else {
            debug!("Purge requested for absent entry {}", key);
        }
        Ok(removed)
    }

    /// Flush every entry in this cache's namespace. Returns the number of
    /// entries removed. Keys outside the namespace are never touched.
    pub async fn clear(&self) -> Result<usize> {
        let Some(store) = self.store.as_ref() else {
            return Ok(0);
        };

        // Collect first: deleting while paging would shift cursors on
        // stores that page by offset.
        let keys = self.scan_namespace(store.as_ref()).await?;

        let mut removed = 0;
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            removed += self.bounded("DEL", store.delete_many(batch)).await?;
        }

        info!(
            "Flushed {} entries from cache namespace {}",
            removed, self.config.namespace
        );
        Ok(removed)
    }

    /// Look at a stored entry without counting it as a lookup
    pub async fn inspect(&self, key: &CacheKey) -> Result<Option<EntryInfo>> {
        let Some(store) = self.store.as_ref() else {
            return Ok(None);
        };

        let store_key = key.namespaced(&self.config.namespace);
        let Some(raw) = self.bounded("GET", store.get(&store_key)).await? else {
            return Ok(None);
        };

        let entry = decode_entry(key, &raw)?;
        let remaining_ttl_seconds = self.bounded("TTL", store.ttl(&store_key)).await?;

        Ok(Some(EntryInfo {
            store_key,
            entry,
            remaining_ttl_seconds,
        }))
    }

    /// Number of entries currently stored in the namespace
    pub async fn entry_count(&self) -> Result<usize> {
        match self.store.as_ref() {
            Some(store) => Ok(self.scan_namespace(store.as_ref()).await?.len()),
            None => Ok(0),
        }
    }

    /// Snapshot of hit/miss/error counters and latency percentiles
    pub fn get_stats(&self) -> CacheStats {
        self.metrics.snapshot(self.is_active())
    }

    /// Zero the metrics
    pub fn reset_stats(&self) {
        self.metrics.reset();
        info!("Cache metrics reset");
    }

    /// Record time spent in the classifier after a miss
    pub fn record_classification_latency(&self, latency: Duration) {
        self.metrics.record_miss_latency(latency);
    }

    /// Probe the backing store with a bounded PING
    pub async fn health_check(&self) -> HealthCheckResult {
        let store = match self.active_store() {
            Some(store) => store,
            None => return HealthCheckResult::disabled(),
        };

        let start = Instant::now();
        match self.bounded("PING", store.ping()).await {
            Ok(()) => HealthCheckResult::responded(
                start.elapsed(),
                store.name(),
                self.config.degraded_threshold,
            ),
            Err(e) => {
                warn!("Cache health check failed: {}", e);
                HealthCheckResult::unhealthy(start.elapsed(), store.name(), &e)
            }
        }
    }

    fn active_store(&self) -> Option<&Arc<dyn BackingStore>> {
        if self.config.enabled {
            self.store.as_ref()
        } else {
            None
        }
    }

    async fn scan_namespace(&self, store: &dyn BackingStore) -> Result<Vec<String>> {
        let prefix = self.config.key_prefix();
        let mut keys = Vec::new();
        let mut cursor = 0;

        loop {
            let (next, page) = self
                .bounded("SCAN", store.scan_prefix(&prefix, cursor, SCAN_PAGE_SIZE))
                .await?;
            // A nested namespace such as `{ns}:v2` shares the prefix
            keys.extend(page.into_iter().filter(|k| {
                k.strip_prefix(&prefix)
                    .is_some_and(CacheKey::is_canonical_digest)
            }));
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    /// Run one store call under the configured timeout
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = self.config.operation_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
                operation: operation.to_string(),
            }),
        }
    }
}

/// Decode a stored entry and check it belongs to `key`
fn decode_entry(key: &CacheKey, raw: &str) -> Result<CacheEntry> {
    let entry = CacheEntry::from_cache_value(raw)?;
    if entry.key != *key {
        return Err(CacheError::Serialization(format!(
            "entry stored under {} carries key {}",
            key.short(),
            entry.key.short()
        )));
    }
    Ok(entry)
}

impl std::fmt::Debug for ClassificationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationCache")
            .field("config", &self.config)
            .field("backend", &self.store.as_ref().map(|s| s.name()))
            .finish()
    }
}
