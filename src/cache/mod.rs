//! Roster result cache.
//!
//! Cache-aside storage for user reads:
//!
//! - **Records**: `user:{id}` holds a JSON snapshot with a per-key TTL.
//! - **Listings**: hash tables `user:param` and `user:pagination`, keyed by the
//!   canonical JSON of the filter, hold lz4-compressed results and page metadata.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! redis_url = "redis://127.0.0.1:6379"
//! record_ttl_seconds = 300
//! query_ttl_seconds = 300
//! operation_timeout_ms = 500
//! key_prefix = ""
//! ```
//!
//! Without `redis_url` the in-process backend is used.

mod backend;
mod codec;
mod config;
mod keys;
mod lock;
mod memory;
mod redis_backend;
mod store;

pub use backend::{CacheBackend, CacheError};
pub use config::CacheConfig;
pub(crate) use config::saturating_millis;
pub use keys::{CacheKeys, filter_field};
pub use memory::InMemoryBackend;
pub use redis_backend::RedisBackend;
pub use store::ResultCache;
