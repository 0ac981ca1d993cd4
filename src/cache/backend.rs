use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache command `{op}` timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },
    #[error("failed to encode cache payload: {0}")]
    Encode(String),
    #[error("failed to decode cache payload: {0}")]
    Decode(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    pub fn encode(err: impl std::fmt::Display) -> Self {
        Self::Encode(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// The subset of key-value and hash-table commands the result cache relies on.
///
/// Semantics follow Redis: `expire` applies to a whole key (hash tables included)
/// and is a no-op for keys that do not exist; `del` removes a key of any kind.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;

    async fn hget(&self, table: &str, field: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn hset(&self, table: &str, field: &str, value: Vec<u8>) -> Result<(), CacheError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;
}
