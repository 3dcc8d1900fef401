//! Content-addressed key derivation
//!
//! The digest covers a version tag, the document text and every metadata
//! pair in key order. Each field is length-prefixed, so `("ab", {})` and
//! `("a", {"b": ""})` cannot collide through concatenation.

use crate::cache::types::CacheKey;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Bump when the canonical form changes; old entries then simply stop hitting.
const KEY_SCHEMA: &[u8] = b"classification-cache/v1";

/// Compute the cache key for a document.
///
/// Metadata is sorted by key before hashing, so the insertion order of the
/// mapping never affects the digest. If the iterator yields a key twice the
/// last value wins, matching map semantics.
///
/// ```
/// use classification_cache::compute_key;
/// use std::collections::HashMap;
///
/// let mut meta = HashMap::new();
/// meta.insert("source", "doc1");
/// let a = compute_key("Il ginocchio...", &meta);
/// let b = compute_key("Il ginocchio...", [("source", "doc1")]);
/// assert_eq!(a, b);
/// ```
pub fn compute_key<I, K, V>(text: &str, metadata: I) -> CacheKey
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sorted: BTreeMap<String, String> = metadata
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned()))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(KEY_SCHEMA);
    update_field(&mut hasher, text.as_bytes());
    hasher.update((sorted.len() as u64).to_be_bytes());
    for (k, v) in &sorted {
        update_field(&mut hasher, k.as_bytes());
        update_field(&mut hasher, v.as_bytes());
    }

    CacheKey::from_digest(&hasher.finalize())
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
