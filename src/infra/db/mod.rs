//! Postgres-backed repository implementations.

mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    Postgres, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{HealthRepo, RepoError};
use crate::query::QueryBinder;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
    binder: QueryBinder,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool, binder: QueryBinder) -> Self {
        Self {
            pool: Arc::new(pool),
            binder,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn binder(&self) -> &QueryBinder {
        &self.binder
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

#[async_trait]
impl HealthRepo for PostgresRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}
