//! Result cache over a [`CacheBackend`].
//!
//! Record snapshots are stored as plain JSON with their own TTL. Listing results are
//! split across two hash tables that share one field key per filter: the records in
//! the results table and the page metadata in the pagination table. Both payloads are
//! lz4-compressed, and each table's expiry is reset on every write.

use std::{sync::Arc, time::Duration};

use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::{
    pagination::{Page, Pagination},
    repos::UserFilter,
};
use crate::domain::entities::UserRecord;

use super::{
    CacheBackend, CacheConfig, CacheError,
    codec::{decode_compressed, decode_json, encode_compressed, encode_json},
    keys::{CacheKeys, filter_field},
};

const TARGET: &str = "roster::cache::store";

#[derive(Clone)]
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    keys: CacheKeys,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        let keys = CacheKeys::new(config.key_prefix.clone());
        Self {
            backend,
            config,
            keys,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cached snapshot of one record. Backend and decode failures count as a miss.
    pub async fn get_record(&self, id: Uuid) -> Option<UserRecord> {
        let key = self.keys.record(id);
        let result = match self.backend.get(&key).await {
            Ok(Some(bytes)) => decode_json::<UserRecord>(&bytes).map(Some),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };

        match result {
            Ok(Some(record)) => {
                counter!("roster_cache_record_hit_total").increment(1);
                Some(record)
            }
            Ok(None) => {
                counter!("roster_cache_record_miss_total").increment(1);
                None
            }
            Err(err) => {
                record_failure("get_record");
                warn!(
                    target = TARGET,
                    key = %key,
                    error = %err,
                    "Record cache read failed; treating as miss"
                );
                None
            }
        }
    }

    pub async fn set_record(&self, record: &UserRecord, ttl: Duration) -> Result<(), CacheError> {
        let key = self.keys.record(record.id);
        let payload = encode_json(record)?;
        self.backend
            .set_ex(&key, payload, ttl)
            .await
            .inspect_err(|_| record_failure("set_record"))
    }

    pub async fn delete_record(&self, id: Uuid) -> Result<(), CacheError> {
        self.backend
            .del(&self.keys.record(id))
            .await
            .inspect_err(|_| record_failure("delete_record"))
    }

    /// Cached listing for `filter`.
    ///
    /// `Ok(None)` when either table lacks the field. Backend errors and undecodable
    /// payloads are returned so the caller can fall back to the store.
    pub async fn get_query_result(
        &self,
        filter: &UserFilter,
    ) -> Result<Option<Page<UserRecord>>, CacheError> {
        let field = filter_field(filter)?;
        let result = self.read_query_result(&field).await;
        if result.is_err() {
            record_failure("get_query_result");
        }
        result
    }

    async fn read_query_result(
        &self,
        field: &str,
    ) -> Result<Option<Page<UserRecord>>, CacheError> {
        let Some(records) = self
            .backend
            .hget(&self.keys.results_table(), field)
            .await?
        else {
            return Ok(None);
        };
        let Some(pagination) = self
            .backend
            .hget(&self.keys.pagination_table(), field)
            .await?
        else {
            debug!(
                target = TARGET,
                field, "Query results cached without pagination; treating as miss"
            );
            return Ok(None);
        };

        let items: Vec<UserRecord> = decode_compressed(&records)?;
        let pagination: Pagination = decode_compressed(&pagination)?;
        Ok(Some(Page::new(items, pagination)))
    }

    /// Store a listing under `filter` and reset both tables' expiry to `ttl`.
    pub async fn set_query_result(
        &self,
        filter: &UserFilter,
        records: &[UserRecord],
        pagination: &Pagination,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let result = self
            .write_query_result(filter, records, pagination, ttl)
            .await;
        if result.is_err() {
            record_failure("set_query_result");
        }
        result
    }

    async fn write_query_result(
        &self,
        filter: &UserFilter,
        records: &[UserRecord],
        pagination: &Pagination,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let field = filter_field(filter)?;
        let records = encode_compressed(&records)?;
        let pagination = encode_compressed(pagination)?;

        let results_table = self.keys.results_table();
        self.backend.hset(&results_table, &field, records).await?;
        self.backend.expire(&results_table, ttl).await?;

        let pagination_table = self.keys.pagination_table();
        self.backend
            .hset(&pagination_table, &field, pagination)
            .await?;
        self.backend.expire(&pagination_table, ttl).await?;
        Ok(())
    }
}

fn record_failure(op: &'static str) {
    counter!("roster_cache_error_total", "op" => op).increment(1);
}
