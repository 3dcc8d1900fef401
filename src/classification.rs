//! Classification results and the cache-aside classification flow
//!
//! The cache never calls the classifier itself. [`CachedClassifier`] is the
//! orchestration the ingestion pipeline runs: look up, classify on a miss,
//! store, return.

use crate::cache::{CacheKey, ClassificationCache};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Domain label assigned to a document, plus whatever confidence metadata
/// the classifier attaches. Unknown fields are kept in `extra` so results
/// from a newer classifier survive a round-trip through the cache.
///
/// `confidence` must be finite to be cached; JSON cannot carry NaN or
/// infinity, so such results are refused at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub domain: String,
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClassificationResult {
    pub fn new(domain: impl Into<String>, confidence: f64) -> Self {
        Self {
            domain: domain.into(),
            confidence,
            extra: Map::new(),
        }
    }

    /// Attach an additional field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// The expensive classification call the cache sits in front of
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        metadata: &HashMap<String, String>,
    ) -> anyhow::Result<ClassificationResult>;
}

/// Result of a cache-aside classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    pub key: CacheKey,
    pub result: ClassificationResult,
    /// Whether the result was served from the cache
    pub from_cache: bool,
}

/// Classifier wrapped with the classification cache
pub struct CachedClassifier<C> {
    cache: Arc<ClassificationCache>,
    classifier: C,
}

impl<C: Classifier> CachedClassifier<C> {
    pub fn new(cache: Arc<ClassificationCache>, classifier: C) -> Self {
        Self { cache, classifier }
    }

    /// Get the underlying cache instance
    pub fn cache(&self) -> Arc<ClassificationCache> {
        self.cache.clone()
    }

    /// Classify a document, consulting the cache first.
    ///
    /// Only classifier errors propagate; a broken cache just means every
    /// call goes to the classifier.
    pub async fn classify(
        &self,
        text: &str,
        metadata: &HashMap<String, String>,
    ) -> anyhow::Result<ClassificationOutcome> {
        let key = self.cache.compute_key(text, metadata);

        if let Some(result) = self.cache.get(&key).await {
            return Ok(ClassificationOutcome {
                key,
                result,
                from_cache: true,
            });
        }

        let start = Instant::now();
        let result = self.classifier.classify(text, metadata).await?;
        let elapsed = start.elapsed();
        self.cache.record_classification_latency(elapsed);
        debug!(
            "Classified {} as {} in {}ms",
            key.short(),
            result.domain,
            elapsed.as_millis()
        );

        self.cache.set_with_default_ttl(&key, &result).await;

        Ok(ClassificationOutcome {
            key,
            result,
            from_cache: false,
        })
    }
}
