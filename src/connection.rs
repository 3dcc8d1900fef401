//! Redis connection management and health check types
//!
//! [`RedisStore`] is the production [`BackingStore`]. The connection is
//! established lazily on first use and then handled by redis'
//! `ConnectionManager`, which reconnects on its own after a drop. A Redis
//! that is down at startup therefore does not stop the process from
//! starting; calls fail (and are absorbed by the cache) until it comes back.

use crate::cache::backend::BackingStore;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Health status of the cache's backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store responded within the degraded threshold
    Healthy,
    /// Store responded, but slowly
    Degraded,
    /// Store did not respond or returned an error
    Unhealthy,
    /// Cache is disabled or has no store configured
    Disabled,
}

impl HealthStatus {
    /// Convert to HTTP status code equivalent
    pub fn to_http_status_code(&self) -> u16 {
        match self {
            HealthStatus::Healthy => 200,
            HealthStatus::Degraded => 200,
            HealthStatus::Disabled => 200,
            HealthStatus::Unhealthy => 503,
        }
    }

    /// Check if lookups are currently being served from the store
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

/// Result of a backing-store health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    /// Round-trip time of the probe in milliseconds
    pub response_time_ms: u64,
    /// Store implementation probed, if any
    pub backend: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Error message (if unhealthy)
    pub error: Option<String>,
}

impl HealthCheckResult {
    /// Create a result for a successful probe
    pub(crate) fn responded(
        response_time: Duration,
        backend: &str,
        degraded_threshold: Duration,
    ) -> Self {
        let status = if response_time > degraded_threshold {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            response_time_ms: response_time.as_millis() as u64,
            backend: Some(backend.to_string()),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Create an unhealthy result
    pub(crate) fn unhealthy(response_time: Duration, backend: &str, error: &CacheError) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time_ms: response_time.as_millis() as u64,
            backend: Some(backend.to_string()),
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }

    pub(crate) fn disabled() -> Self {
        Self {
            status: HealthStatus::Disabled,
            response_time_ms: 0,
            backend: None,
            timestamp: Utc::now(),
            error: None,
        }
    }
}

/// Redis-backed store
pub struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    display_location: String,
}

impl RedisStore {
    /// Create a store for the given connection string without connecting
    ///
    /// # Example
    /// ```no_run
    /// use classification_cache::RedisStore;
    ///
    /// let store = RedisStore::open("redis://localhost:6379/0")?;
    /// # Ok::<(), classification_cache::CacheError>(())
    /// ```
    pub fn open(location: &str) -> Result<Self> {
        let client = Client::open(location).map_err(|e| {
            CacheError::InvalidConfiguration(format!("invalid Redis location: {}", e))
        })?;

        let display_location = redact_location(location);
        info!("Configured Redis backing store at {}", display_location);

        Ok(Self {
            client,
            connection: OnceCell::new(),
            display_location,
        })
    }

    /// Connection string with any credentials masked
    pub fn location(&self) -> &str {
        &self.display_location
    }

    /// Whether a connection has been established yet
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                debug!("Connecting to Redis at {}", self.display_location);
                let manager = self.client.get_connection_manager().await?;
                info!("Connected to Redis at {}", self.display_location);
                Ok::<_, CacheError>(manager)
            })
            .await?;

        // ConnectionManager is a cheap handle onto a shared multiplexed connection
        Ok(manager.clone())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("location", &self.display_location)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed as usize)
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.connection().await?;
        // -2: no such key, -1: key without expiry
        let ttl: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
        Ok(u64::try_from(ttl).ok())
    }

    async fn scan_prefix(
        &self,
        prefix: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>)> {
        let mut conn = self.connection().await?;
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(format!("{}*", prefix))
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next, keys))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Mask the userinfo part of a connection string so it can be logged
pub(crate) fn redact_location(location: &str) -> String {
    match (location.find("://"), location.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &location[..scheme_end], &location[at..])
        }
        _ => location.to_string(),
    }
}
