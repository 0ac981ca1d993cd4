#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use roster::application::pagination::{NormalizedFilter, Page, Pagination};
use roster::application::repos::{
    CreateUserParams, HealthRepo, RepoError, UpdateUserParams, UserFilter, UsersRepo,
    UsersWriteRepo,
};
use roster::application::users::UserService;
use roster::cache::{CacheBackend, CacheConfig, CacheError, InMemoryBackend, ResultCache};
use roster::domain::entities::UserRecord;

/// Store double that keeps users in memory and counts reads.
#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<HashMap<Uuid, UserRecord>>,
    reads: AtomicUsize,
    /// When set, updates report zero affected rows.
    pub lose_updates: bool,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn losing_updates() -> Self {
        Self {
            lose_updates: true,
            ..Self::default()
        }
    }

    pub async fn seed(&self, name: &str, age: i32) -> UserRecord {
        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_ascii_lowercase()),
            age,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().await.insert(record.id, record.clone());
        record
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsersRepo for MemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn find_all(&self, filter: &UserFilter) -> Result<Page<UserRecord>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let normalized = NormalizedFilter::from(filter);

        let mut matching: Vec<UserRecord> = self
            .users
            .lock()
            .await
            .values()
            .filter(|user| {
                normalized.name.as_deref().is_none_or(|name| {
                    user.name
                        .to_ascii_lowercase()
                        .contains(&name.to_ascii_lowercase())
                })
            })
            .filter(|user| normalized.min_age.is_none_or(|min| user.age >= min))
            .filter(|user| normalized.max_age.is_none_or(|max| user.age <= max))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let items: Vec<UserRecord> = matching
            .into_iter()
            .skip(normalized.offset() as usize)
            .take(normalized.limit() as usize)
            .collect();
        let pagination = Pagination::new(&normalized, items.len(), total);
        Ok(Page::new(items, pagination))
    }
}

#[async_trait]
impl UsersWriteRepo for MemoryUsers {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().await;
        if users.values().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: params.name,
            email: params.email,
            age: params.age,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_user(&self, params: UpdateUserParams) -> Result<(), RepoError> {
        if self.lose_updates {
            return Err(RepoError::NotFound);
        }
        let mut users = self.users.lock().await;
        let user = users.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        user.name = params.name;
        user.email = params.email;
        user.age = params.age;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError> {
        self.users
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl HealthRepo for MemoryUsers {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Cache backend whose every command fails as if the server were unreachable.
pub struct UnreachableBackend;

#[async_trait]
impl CacheBackend for UnreachableBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn set_ex(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn hget(&self, _table: &str, _field: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn hset(&self, _table: &str, _field: &str, _value: Vec<u8>) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::backend("connection refused"))
    }
}

/// In-memory backend whose `del` always times out.
#[derive(Default)]
pub struct StickyBackend {
    inner: InMemoryBackend,
}

#[async_trait]
impl CacheBackend for StickyBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("DEL timed out"))
    }

    async fn hget(&self, table: &str, field: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.hget(table, field).await
    }

    async fn hset(&self, table: &str, field: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.inner.hset(table, field, value).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.expire(key, ttl).await
    }
}

pub fn result_cache(backend: Arc<dyn CacheBackend>) -> Arc<ResultCache> {
    Arc::new(ResultCache::new(backend, CacheConfig::default()))
}

pub fn memory_cache() -> Arc<ResultCache> {
    result_cache(Arc::new(InMemoryBackend::new()))
}

pub fn service(store: &Arc<MemoryUsers>, cache: &Arc<ResultCache>) -> UserService {
    UserService::new(store.clone(), store.clone(), cache.clone())
}
