//! Backing-store abstraction and the in-process implementation
//!
//! [`ClassificationCache`](crate::cache::ClassificationCache) talks to its
//! store only through [`BackingStore`]. Production uses
//! [`RedisStore`](crate::connection::RedisStore); [`MemoryStore`] backs tests
//! and local runs without Redis.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Key-value store with per-key expiry
///
/// Implementations must be safe to share across tasks; the cache adds no
/// synchronization of its own. Timeouts are applied by the caller.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &'static str;

    /// `GET key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SET key value EX ttl_seconds`
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// `DEL key`; returns whether something was removed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove several keys at once; returns how many existed
    async fn delete_many(&self, keys: &[String]) -> Result<usize>;

    /// Remaining lifetime, `None` if the key is absent or never expires
    async fn ttl(&self, key: &str) -> Result<Option<u64>>;

    /// One page of keys starting with `prefix`. Start with cursor 0; a
    /// returned cursor of 0 means the scan is complete.
    async fn scan_prefix(&self, prefix: &str, cursor: u64, count: usize)
        -> Result<(u64, Vec<String>)>;

    /// Round-trip liveness probe
    async fn ping(&self) -> Result<()>;
}

/// In-process store with lazy TTL expiry
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, StoredValue>>>,
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|v| !v.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, v| !v.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(stored) if !stored.is_expired(now) => return Ok(Some(stored.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it so it does not linger until the next cleanup
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|v| v.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl_seconds))
            // Far enough out to never expire within a process lifetime
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(100 * 365 * 24 * 3600));

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .is_some_and(|stored| !stored.is_expired(now)))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|stored| !stored.is_expired(now))
            .count())
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.expires_at.saturating_duration_since(now).as_secs()))
    }

    async fn scan_prefix(
        &self,
        prefix: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>)> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        // The cursor is an offset into the ordered key space
        let matching: Vec<&String> = entries
            .iter()
            .filter(|(k, v)| k.starts_with(prefix) && !v.is_expired(now))
            .map(|(k, _)| k)
            .collect();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(matching.len());
        let end = start.saturating_add(count.max(1)).min(matching.len());
        let page = matching[start..end].iter().map(|k| k.to_string()).collect();
        let next = if end >= matching.len() { 0 } else { end as u64 };

        Ok((next, page))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
