//! In-process [`CacheBackend`] used when no Redis URL is configured, and in tests.
//!
//! Expiry follows the whole-key semantics of Redis. Dead keys are dropped when an access
//! finds them, and every [`SWEEP_INTERVAL`] writes a sweep drops the ones nobody reads.

use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{
    CacheBackend, CacheError,
    lock::{rw_read, rw_write},
};

const LOCK_TARGET: &str = "roster::cache::memory";

/// Writes between two sweeps of expired keys.
pub const SWEEP_INTERVAL: usize = 256;

#[derive(Debug)]
struct Entry<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Entry<T> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    values: RwLock<HashMap<String, Entry<Vec<u8>>>>,
    tables: RwLock<HashMap<String, Entry<HashMap<String, Vec<u8>>>>>,
    writes: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held, live or not yet reclaimed.
    pub fn len(&self) -> usize {
        rw_read(&self.values, LOCK_TARGET, "len").len()
            + rw_read(&self.tables, LOCK_TARGET, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired key.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        rw_write(&self.values, LOCK_TARGET, "purge").retain(|_, entry| entry.is_live(now));
        rw_write(&self.tables, LOCK_TARGET, "purge").retain(|_, entry| entry.is_live(now));
    }

    fn record_write(&self) {
        let count = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if count % SWEEP_INTERVAL == 0 {
            self.purge_expired();
        }
    }
}

fn remove_if_dead<T>(map: &RwLock<HashMap<String, Entry<T>>>, key: &str, now: Instant) {
    let mut guard = rw_write(map, LOCK_TARGET, "evict");
    if guard.get(key).is_some_and(|entry| !entry.is_live(now)) {
        guard.remove(key);
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let found = {
            let values = rw_read(&self.values, LOCK_TARGET, "get");
            match values.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => true,
                None => false,
            }
        };
        if found {
            remove_if_dead(&self.values, key, now);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Some(Instant::now() + ttl),
        };
        rw_write(&self.values, LOCK_TARGET, "set_ex").insert(key.to_string(), entry);
        self.record_write();
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.values, LOCK_TARGET, "del").remove(key);
        rw_write(&self.tables, LOCK_TARGET, "del").remove(key);
        Ok(())
    }

    async fn hget(&self, table: &str, field: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let found = {
            let tables = rw_read(&self.tables, LOCK_TARGET, "hget");
            match tables.get(table) {
                Some(entry) if entry.is_live(now) => return Ok(entry.value.get(field).cloned()),
                Some(_) => true,
                None => false,
            }
        };
        if found {
            remove_if_dead(&self.tables, table, now);
        }
        Ok(None)
    }

    async fn hset(&self, table: &str, field: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut tables = rw_write(&self.tables, LOCK_TARGET, "hset");
        let entry = tables.entry(table.to_string()).or_insert_with(|| Entry {
            value: HashMap::new(),
            expires_at: None,
        });
        if !entry.is_live(now) {
            entry.value.clear();
            entry.expires_at = None;
        }
        entry.value.insert(field.to_string(), value);
        drop(tables);
        self.record_write();
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let deadline = Some(now + ttl);

        let mut values = rw_write(&self.values, LOCK_TARGET, "expire");
        match values.get_mut(key) {
            Some(entry) if entry.is_live(now) => entry.expires_at = deadline,
            Some(_) => {
                values.remove(key);
            }
            None => {}
        }
        drop(values);

        let mut tables = rw_write(&self.tables, LOCK_TARGET, "expire");
        match tables.get_mut(key) {
            Some(entry) if entry.is_live(now) => entry.expires_at = deadline,
            Some(_) => {
                tables.remove(key);
            }
            None => {}
        }
        Ok(())
    }
}
