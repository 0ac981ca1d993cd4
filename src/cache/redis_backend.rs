//! Redis-backed [`CacheBackend`] over a shared multiplexed connection.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use redis::{AsyncCommands, RedisResult, aio::MultiplexedConnection};
use tracing::info;

use super::{CacheBackend, CacheError, config::saturating_millis};

#[derive(Clone)]
pub struct RedisBackend {
    connection: MultiplexedConnection,
    timeout: Duration,
}

impl RedisBackend {
    /// Open a client for `url` and establish the multiplexed connection.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|err| CacheError::backend(format!("invalid Redis URL: {err}")))?;
        let connection = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout {
                op: "CONNECT",
                timeout,
            })?
            .map_err(|err| CacheError::backend(format!("failed to connect to Redis: {err}")))?;

        info!(
            target = "roster::cache::redis",
            timeout_ms = saturating_millis(timeout),
            "Connected to Redis"
        );
        Ok(Self {
            connection,
            timeout,
        })
    }

    async fn run<T>(
        &self,
        op: &'static str,
        command: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CacheError::backend(format!("Redis {op} failed: {err}"))),
            Err(_) => Err(CacheError::Timeout {
                op,
                timeout: self.timeout,
            }),
        }
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut con = self.connection.clone();
        self.run("GET", async move { con.get(key).await }).await
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        self.run("SETEX", async move {
            con.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl)).await
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        self.run("DEL", async move { con.del::<_, ()>(key).await })
            .await
    }

    async fn hget(&self, table: &str, field: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut con = self.connection.clone();
        self.run("HGET", async move { con.hget(table, field).await })
            .await
    }

    async fn hset(&self, table: &str, field: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        self.run("HSET", async move {
            con.hset::<_, _, _, ()>(table, field, value).await
        })
        .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut con = self.connection.clone();
        let seconds = i64::try_from(ttl_seconds(ttl)).unwrap_or(i64::MAX);
        self.run("EXPIRE", async move { con.expire::<_, ()>(key, seconds).await })
            .await
    }
}
