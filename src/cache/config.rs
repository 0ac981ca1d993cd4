//! Result cache configuration.
//!
//! Populated from the `[cache]` section of `roster.toml`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_RECORD_TTL_SECS: u64 = 300;
const DEFAULT_QUERY_TTL_SECS: u64 = 300;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of `user:{id}` entries.
    pub record_ttl_seconds: u64,
    /// Lifetime of the query-result tables, reset on every write.
    pub query_ttl_seconds: u64,
    /// Upper bound for a single backend command.
    pub operation_timeout_ms: u64,
    /// Prepended to every key, e.g. `roster:`.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            record_ttl_seconds: DEFAULT_RECORD_TTL_SECS,
            query_ttl_seconds: DEFAULT_QUERY_TTL_SECS,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            key_prefix: String::new(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            record_ttl_seconds: settings.record_ttl.as_secs(),
            query_ttl_seconds: settings.query_ttl.as_secs(),
            operation_timeout_ms: saturating_millis(settings.operation_timeout),
            key_prefix: settings.key_prefix.clone(),
        }
    }
}

/// Whole milliseconds in `duration`, capped at `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl CacheConfig {
    pub fn record_ttl(&self) -> Duration {
        Duration::from_secs(self.record_ttl_seconds.max(1))
    }

    pub fn query_ttl(&self) -> Duration {
        Duration::from_secs(self.query_ttl_seconds.max(1))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate_instead_of_wrapping() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.record_ttl(), Duration::from_secs(300));
        assert_eq!(config.query_ttl(), Duration::from_secs(300));
        assert_eq!(config.operation_timeout(), Duration::from_millis(500));
        assert!(config.key_prefix.is_empty());
    }

    #[test]
    fn test_zero_ttl_clamps_to_one_second() {
        let config = CacheConfig {
            record_ttl_seconds: 0,
            query_ttl_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.record_ttl(), Duration::from_secs(1));
        assert_eq!(config.query_ttl(), Duration::from_secs(1));
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{"query_ttl_seconds": 60, "key_prefix": "roster:"}"#;
        let config: CacheConfig = serde_json::from_str(json).expect("valid cache config");
        assert_eq!(config.query_ttl(), Duration::from_secs(60));
        assert_eq!(config.record_ttl(), Duration::from_secs(300));
        assert_eq!(config.key_prefix, "roster:");
    }
}
