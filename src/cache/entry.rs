//! Stored cache entries

use crate::cache::types::CacheKey;
use crate::classification::ClassificationResult;
use crate::error::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// A cache entry as persisted in the backing store
///
/// Entries are immutable. Writing the same key again replaces the whole
/// entry; nothing is merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The content digest this entry is stored under
    pub key: CacheKey,

    /// The cached classification
    pub value: ClassificationResult,

    /// When the entry was written
    pub stored_at: DateTime<Utc>,

    /// Expiry requested at write time
    pub ttl_seconds: u64,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(key: CacheKey, value: ClassificationResult, ttl_seconds: u64) -> Self {
        Self {
            key,
            value,
            stored_at: Utc::now(),
            ttl_seconds,
        }
    }

    /// Wall-clock expiry derived from `stored_at + ttl_seconds`
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .and_then(|ttl| self.stored_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Check if the entry has expired. The backing store is authoritative;
    /// this is for inspection output.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Get the age of the entry
    pub fn age(&self) -> std::time::Duration {
        (Utc::now() - self.stored_at)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Encode for the backing store
    pub fn to_cache_value(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored value
    pub fn from_cache_value(value: &str) -> Result<Self> {
        Ok(serde_json::from_str(value)?)
    }
}

/// Admin view of a stored entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Key as stored, including the namespace
    pub store_key: String,

    pub entry: CacheEntry,

    /// Remaining lifetime reported by the backing store, if it has one
    pub remaining_ttl_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::compute_key;
    use crate::error::CacheError;

    fn sample_entry(ttl: u64) -> CacheEntry {
        CacheEntry::new(
            compute_key("Il ginocchio...", [("source", "doc1")]),
            ClassificationResult::new("orthopedics", 0.92),
            ttl,
        )
    }

    #[test]
    fn test_entry_creation() {
        let entry = sample_entry(3600);
        assert_eq!(entry.value.domain, "orthopedics");
        assert_eq!(entry.ttl_seconds, 3600);
        assert!(!entry.is_expired());
        assert!(entry.expires_at() > entry.stored_at);
    }

    #[test]
    fn test_entry_expired() {
        let mut entry = sample_entry(60);
        entry.stored_at = Utc::now() - ChronoDuration::seconds(120);
        assert!(entry.is_expired());
        assert!(entry.age() >= std::time::Duration::from_secs(120));
    }

    #[test]
    fn test_entry_huge_ttl_does_not_overflow() {
        let entry = sample_entry(u64::MAX);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_cache_value_encoding() {
        let entry = sample_entry(604_800);
        let encoded = entry.to_cache_value().unwrap();
        assert!(encoded.contains("\"domain\":\"orthopedics\""));

        let decoded = CacheEntry::from_cache_value(&encoded).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_decode_schema_drift() {
        let err = CacheEntry::from_cache_value(r#"{"label":"orthopedics"}"#).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
