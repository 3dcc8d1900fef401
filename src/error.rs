//! Error types for cache operations
//!
//! Only `InvalidConfiguration` is meant to reach the caller of the hot path.
//! Everything a backing store can throw at `get`/`set` is recoverable and gets
//! absorbed into metrics and logs by [`crate::cache::ClassificationCache`].

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing store unreachable, refused the command, or rejected credentials
    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    /// Backing store call exceeded the configured operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {operation}")]
    Timeout { timeout_ms: u64, operation: String },

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operator-supplied key is not a valid digest
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

impl CacheError {
    /// Whether the error is absorbed at the `get`/`set` boundary
    /// instead of surfacing to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::Unavailable(_) | CacheError::Timeout { .. } | CacheError::Serialization(_)
        )
    }

    /// Short label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Unavailable(_) => "unavailable",
            CacheError::Timeout { .. } => "timeout",
            CacheError::Serialization(_) => "serialization",
            CacheError::InvalidConfiguration(_) => "invalid_configuration",
            CacheError::InvalidKey(_) => "invalid_key",
        }
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::Unavailable("Connection refused".to_string());
        assert_eq!(
            error.to_string(),
            "Backing store unavailable: Connection refused"
        );

        let timeout_error = CacheError::Timeout {
            timeout_ms: 500,
            operation: "GET".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 500ms"));

        let config_error = CacheError::InvalidConfiguration("ttl_seconds must be positive".into());
        assert!(config_error.to_string().contains("ttl_seconds"));
    }

    #[test]
    fn test_recoverable_classes() {
        assert!(CacheError::Unavailable("down".into()).is_recoverable());
        assert!(CacheError::Serialization("bad json".into()).is_recoverable());
        assert!(CacheError::Timeout {
            timeout_ms: 1,
            operation: "SET".into()
        }
        .is_recoverable());

        assert!(!CacheError::InvalidConfiguration("bad".into()).is_recoverable());
        assert!(!CacheError::InvalidKey("xyz".into()).is_recoverable());
    }

    #[test]
    fn test_serde_error_conversion() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let error: CacheError = err.into();
        assert!(matches!(error, CacheError::Serialization(_)));
        assert_eq!(error.kind(), "serialization");
    }
}
