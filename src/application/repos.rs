//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::Page;
use crate::domain::entities::UserRecord;
use crate::query::QueryError;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("failed to build query: {0}")]
    QueryBuild(#[from] QueryError),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Listing criteria as supplied by the caller.
///
/// Its serialized form is the query-cache key, so it only carries what selects rows.
/// Zero or absent paging fields are resolved by
/// [`NormalizedFilter`](crate::application::pagination::NormalizedFilter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub page: i64,
    pub page_size: i64,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

/// Per-request cache directives for a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheControl {
    /// Skip the cached copy and rebuild it from the store.
    pub must_revalidate: bool,
}

impl CacheControl {
    pub fn revalidate() -> Self {
        Self {
            must_revalidate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub age: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUserParams {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, RepoError>;

    async fn find_all(&self, filter: &UserFilter) -> Result<Page<UserRecord>, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no row was changed.
    async fn update_user(&self, params: UpdateUserParams) -> Result<(), RepoError>;

    /// Fails with [`RepoError::NotFound`] when no row was removed.
    async fn delete_user(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
