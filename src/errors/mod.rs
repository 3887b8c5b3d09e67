/// Error types for the cache crate
///
/// Routine outcomes (cache miss without a recipe, lock contention, a failed
/// stale refresh) are not errors and never show up here; they surface as
/// `CacheLookup { value: None, is_fresh: false }` or as stats counters.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("No cached value available for {key}")]
    Unavailable { key: String },

    #[error("Failed to build cache key for endpoint {endpoint}: {source}")]
    KeyEncoding {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cached value for {key} does not decode: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// True for errors a caller can resolve by simply retrying later
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CacheError::Unavailable { .. })
    }
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_recoverable() {
        let err = CacheError::Unavailable {
            key: "price:BTC".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "No cached value available for price:BTC");
    }

    #[test]
    fn test_io_error_converts() {
        fn read_missing() -> CacheResult<String> {
            Ok(std::fs::read_to_string("/nonexistent/dashcache.toml")?)
        }
        let err = read_missing().unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_config_error_is_not_recoverable() {
        let err = CacheError::Config("tick_interval_ms must be positive".to_string());
        assert!(!err.is_recoverable());
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
