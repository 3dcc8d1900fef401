//! Classification cache demo
//!
//! Runs a small ingestion loop through the cache against Redis when
//! `REDIS_URL` is set, or against the in-process store otherwise.
//!
//! Run with: cargo run --example cache_demo

use async_trait::async_trait;
use classification_cache::{
    CacheConfig, CachedClassifier, ClassificationCache, ClassificationResult, Classifier,
    MemoryStore,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct SimulatedLlm;

#[async_trait]
impl Classifier for SimulatedLlm {
    async fn classify(
        &self,
        text: &str,
        _metadata: &HashMap<String, String>,
    ) -> anyhow::Result<ClassificationResult> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let domain = if text.contains("ginocchio") {
            "orthopedics"
        } else {
            "general_medicine"
        };
        Ok(ClassificationResult::new(domain, 0.9).with_field("model", "simulated"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "classification_cache=debug,cache_demo=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Classification Cache Demo ===");

    let config = CacheConfig::from_env()?;
    let cache = if config.backing_store_location.is_some() {
        info!("Using Redis backing store");
        ClassificationCache::new(config)?
    } else {
        info!("REDIS_URL not set, using in-process store");
        ClassificationCache::with_store(config, Arc::new(MemoryStore::new()))?
    };
    let cache = Arc::new(cache);

    let health = cache.health_check().await;
    info!("Health: {:?} ({}ms)", health.status, health.response_time_ms);

    let pipeline = CachedClassifier::new(cache.clone(), SimulatedLlm);
    let documents = [
        "Il ginocchio è l'articolazione intermedia dell'arto inferiore...",
        "La pressione arteriosa viene misurata in millimetri di mercurio...",
    ];
    let metadata = HashMap::from([("source".to_string(), "lecture-3".to_string())]);

    for pass in 1..=2 {
        info!("\n--- Ingestion pass {} ---", pass);
        for doc in &documents {
            let outcome = pipeline.classify(doc, &metadata).await?;
            info!(
                "{} -> {} (from cache: {})",
                outcome.key.short(),
                outcome.result.domain,
                outcome.from_cache
            );
        }
    }

    info!("\n--- Stats ---");
    info!("{}", cache.get_stats());

    info!("\n--- Flush ---");
    let removed = cache.clear().await?;
    info!("Removed {} entries", removed);

    info!("\n=== Demo Complete ===");
    Ok(())
}
