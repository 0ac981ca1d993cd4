//! Cache-aside coordination for user reads and writes.
//!
//! Reads consult the result cache first and fall back to the store; writes go to the
//! store first and only then drop the affected record snapshot. Cache failures never
//! fail a request: they are logged and the store answer is returned.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::pagination::Page;
use crate::application::repos::{
    CacheControl, CreateUserParams, RepoError, UpdateUserParams, UserFilter, UsersRepo,
    UsersWriteRepo,
};
use crate::cache::ResultCache;
use crate::domain::entities::UserRecord;

const TARGET: &str = "roster::application::users";

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for UserServiceError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => UserServiceError::NotFound,
            other => UserServiceError::Repo(other),
        }
    }
}

/// Partial update; absent or blank fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUserCommand {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl UpdateUserCommand {
    fn merge_onto(self, current: &UserRecord) -> UpdateUserParams {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| current.name.clone());
        let email = self
            .email
            .filter(|email| !email.trim().is_empty())
            .unwrap_or_else(|| current.email.clone());
        let age = self.age.filter(|age| *age > 0).unwrap_or(current.age);

        UpdateUserParams {
            id: current.id,
            name,
            email,
            age,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    reader: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    cache: Arc<ResultCache>,
}

impl UserService {
    pub fn new(
        reader: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, UserServiceError> {
        if let Some(user) = self.cache.get_record(id).await {
            return Ok(user);
        }

        self.load_record(id, "find_by_id").await
    }

    /// Read `id` from the store and overwrite its record snapshot.
    async fn load_record(
        &self,
        id: Uuid,
        op: &'static str,
    ) -> Result<UserRecord, UserServiceError> {
        counter!("roster_store_read_total", "op" => op).increment(1);
        let user = self
            .reader
            .find_by_id(id)
            .await
            .map_err(|err| observe(op, err))?;

        if let Err(err) = self
            .cache
            .set_record(&user, self.cache.config().record_ttl())
            .await
        {
            warn!(
                target = TARGET,
                user_id = %id,
                error = %err,
                "Failed to populate record cache"
            );
        }

        Ok(user)
    }

    /// List users matching `filter`.
    ///
    /// With `must_revalidate` the cached copy is bypassed and overwritten. A failing
    /// cache read falls through to the store.
    pub async fn list(
        &self,
        filter: &UserFilter,
        control: CacheControl,
    ) -> Result<Page<UserRecord>, UserServiceError> {
        let started = Instant::now();
        let result = self.list_inner(filter, control).await;
        histogram!("roster_list_users_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn list_inner(
        &self,
        filter: &UserFilter,
        control: CacheControl,
    ) -> Result<Page<UserRecord>, UserServiceError> {
        if control.must_revalidate {
            debug!(target = TARGET, "Revalidation requested; bypassing query cache");
            return self.load_and_populate(filter).await;
        }

        match self.cache.get_query_result(filter).await {
            Ok(Some(page)) => {
                counter!("roster_cache_query_hit_total").increment(1);
                return Ok(page);
            }
            Ok(None) => {
                counter!("roster_cache_query_miss_total").increment(1);
            }
            Err(err) => {
                warn!(
                    target = TARGET,
                    error = %err,
                    "Query cache read failed; serving from store"
                );
            }
        }

        self.load_and_populate(filter).await
    }

    async fn load_and_populate(
        &self,
        filter: &UserFilter,
    ) -> Result<Page<UserRecord>, UserServiceError> {
        counter!("roster_store_read_total", "op" => "find_all").increment(1);
        let page = self
            .reader
            .find_all(filter)
            .await
            .map_err(|err| observe("find_all", err))?;

        if let Err(err) = self
            .cache
            .set_query_result(
                filter,
                &page.items,
                &page.pagination,
                self.cache.config().query_ttl(),
            )
            .await
        {
            warn!(
                target = TARGET,
                error = %err,
                "Failed to populate query cache"
            );
        }

        Ok(page)
    }

    pub async fn create(&self, params: CreateUserParams) -> Result<UserRecord, UserServiceError> {
        self.writer
            .create_user(params)
            .await
            .map_err(|err| observe("create", err))
    }

    /// Merge `command` onto the current record, persist it and return the fresh row.
    ///
    /// The fresh row always comes from the store, so a snapshot that survived a failed
    /// invalidation is neither returned nor kept.
    pub async fn update(
        &self,
        id: Uuid,
        command: UpdateUserCommand,
    ) -> Result<UserRecord, UserServiceError> {
        let current = self.find_by_id(id).await?;
        self.replace(command.merge_onto(&current)).await?;
        self.load_record(id, "update").await
    }

    /// Overwrite a record. The record snapshot is dropped only after the store succeeds.
    pub async fn replace(&self, params: UpdateUserParams) -> Result<(), UserServiceError> {
        let id = params.id;
        self.writer
            .update_user(params)
            .await
            .map_err(|err| observe("update", err))?;
        self.invalidate_record(id).await;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), UserServiceError> {
        self.writer
            .delete_user(id)
            .await
            .map_err(|err| observe("delete", err))?;
        self.invalidate_record(id).await;
        Ok(())
    }

    async fn invalidate_record(&self, id: Uuid) {
        if let Err(err) = self.cache.delete_record(id).await {
            warn!(
                target = TARGET,
                user_id = %id,
                error = %err,
                "Failed to invalidate record cache"
            );
        }
    }
}

fn observe(op: &'static str, err: RepoError) -> UserServiceError {
    match &err {
        RepoError::NotFound => debug!(target = TARGET, op, "User not found"),
        RepoError::Duplicate { .. } | RepoError::InvalidInput { .. } => {
            warn!(target = TARGET, op, error = %err, "User store rejected the request")
        }
        _ => error!(target = TARGET, op, error = %err, "User store operation failed"),
    }
    err.into()
}
