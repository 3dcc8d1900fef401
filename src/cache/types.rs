//! Core type definitions for the cache system

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Content-addressed cache key: the hex SHA-256 digest of a document's
/// canonical `(text, metadata)` form. See [`crate::cache::compute_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey(String);

impl CacheKey {
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        CacheKey(hex::encode(digest))
    }

    /// Parse an operator-supplied digest, e.g. from an admin purge request.
    /// Accepts upper or lower case and normalizes to lower case.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != DIGEST_HEX_LEN {
            return Err(CacheError::InvalidKey(format!(
                "expected {} hex characters, got {}",
                DIGEST_HEX_LEN,
                trimmed.len()
            )));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CacheError::InvalidKey(format!(
                "{:?} is not hexadecimal",
                trimmed
            )));
        }
        Ok(CacheKey(trimmed.to_ascii_lowercase()))
    }

    /// Whether `raw` is a digest exactly as this crate writes it:
    /// 64 lowercase hex characters
    pub(crate) fn is_canonical_digest(raw: &str) -> bool {
        raw.len() == DIGEST_HEX_LEN
            && raw
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key as stored in the backing store: `"{namespace}:{digest}"`
    pub fn namespaced(&self, namespace: &str) -> String {
        format!("{}:{}", namespace, self.0)
    }

    /// First 12 characters, enough to tell entries apart in logs
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = CacheError;

    fn try_from(raw: String) -> Result<Self> {
        CacheKey::parse(&raw)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

impl std::str::FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        CacheKey::parse(s)
    }
}

/// p50/p95 over a rolling window of latency samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LatencySummary {
    /// Number of samples currently in the window
    pub samples: usize,
    pub p50_ms: f64,
    pub p95_ms: f64,
}

/// Snapshot of cache metrics, returned by `get_stats`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Whether the cache is serving lookups (enabled and a store is configured)
    pub active: bool,

    /// Lookups answered from the backing store
    pub hits: u64,

    /// Lookups with no stored entry (includes lookups while bypassed)
    pub misses: u64,

    /// Lookups that failed against the backing store and fell through
    pub errors: u64,

    /// Entries written successfully
    pub writes: u64,

    /// Writes dropped because of a store failure or an invalid TTL
    pub write_errors: u64,

    /// `hits / (hits + misses)`, 0.0 before any lookup
    pub hit_rate: f64,

    /// Round-trip latency of lookups that hit
    pub hit_latency: LatencySummary,

    /// Time spent in the classifier after a miss
    pub miss_latency: LatencySummary,
}

impl CacheStats {
    /// Total number of `get` calls represented by this snapshot
    pub fn total_lookups(&self) -> u64 {
        self.hits + self.misses + self.errors
    }

    /// Fraction of lookups that failed against the store
    pub fn error_rate(&self) -> f64 {
        let total = self.total_lookups();
        if total == 0 {
            0.0
        } else {
            self.errors as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, errors: {}, hit_rate: {:.2}%, hit p95: {:.1}ms, miss p95: {:.1}ms }}",
            self.hits,
            self.misses,
            self.errors,
            self.hit_rate * 100.0,
            self.hit_latency.p95_ms,
            self.miss_latency.p95_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn test_cache_key_parse() {
        let key = CacheKey::parse(DIGEST).unwrap();
        assert_eq!(key.as_str(), DIGEST);

        let upper = CacheKey::parse(&DIGEST.to_uppercase()).unwrap();
        assert_eq!(upper, key);

        assert!(matches!(
            CacheKey::parse("abc123"),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(CacheKey::parse(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_cache_key_deserialization_validates() {
        let key: CacheKey = serde_json::from_str(&format!("\"{}\"", DIGEST)).unwrap();
        assert_eq!(key.as_str(), DIGEST);
        assert_eq!(serde_json::to_string(&key).unwrap(), format!("\"{}\"", DIGEST));

        assert!(serde_json::from_str::<CacheKey>("\"ééééééééé\"").is_err());
        assert!(serde_json::from_str::<CacheKey>("\"abc123\"").is_err());
    }

    #[test]
    fn test_canonical_digest() {
        assert!(CacheKey::is_canonical_digest(DIGEST));
        assert!(!CacheKey::is_canonical_digest(&DIGEST.to_uppercase()));
        assert!(!CacheKey::is_canonical_digest(&DIGEST[1..]));
        assert!(!CacheKey::is_canonical_digest(&format!("v2:{}", DIGEST)));
    }

    #[test]
    fn test_cache_key_namespaced() {
        let key: CacheKey = DIGEST.parse().unwrap();
        assert_eq!(
            key.namespaced("classification_cache"),
            format!("classification_cache:{}", DIGEST)
        );
        assert_eq!(key.short(), "9f86d081884c");
    }

    #[test]
    fn test_cache_stats_rates() {
        let stats = CacheStats {
            hits: 8,
            misses: 2,
            errors: 2,
            ..Default::default()
        };
        assert_eq!(stats.total_lookups(), 12);
        assert!((stats.error_rate() - 2.0 / 12.0).abs() < f64::EPSILON);

        assert_eq!(CacheStats::default().error_rate(), 0.0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            hit_rate: 100.0 / 150.0,
            ..Default::default()
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("misses: 50"));
        assert!(display.contains("66.67%"));
    }
}
