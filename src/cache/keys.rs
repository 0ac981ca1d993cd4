//! Cache key definitions.
//!
//! Records live under `user:{id}`. Query results live in two hash tables,
//! `user:param` and `user:pagination`, whose fields are the canonical JSON of the
//! filter that produced them.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::application::repos::UserFilter;

use super::CacheError;

const RECORD_NAMESPACE: &str = "user";
const RESULTS_TABLE: &str = "user:param";
const PAGINATION_TABLE: &str = "user:pagination";

/// Backend keys resolved against a configured prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn record(&self, id: Uuid) -> String {
        format!("{}{RECORD_NAMESPACE}:{id}", self.prefix)
    }

    pub fn results_table(&self) -> String {
        format!("{}{RESULTS_TABLE}", self.prefix)
    }

    pub fn pagination_table(&self) -> String {
        format!("{}{PAGINATION_TABLE}", self.prefix)
    }
}

/// Field key for a filter inside the query tables.
///
/// Object keys are emitted in sorted order at every depth, so two filters with the
/// same content produce the same field regardless of how they were assembled.
pub fn filter_field(filter: &UserFilter) -> Result<String, CacheError> {
    let value = serde_json::to_value(filter).map_err(CacheError::encode)?;
    serde_json::to_string(&canonicalize(value)).map_err(CacheError::encode)
}

pub(crate) fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_and_table_keys_carry_prefix() {
        let id = Uuid::nil();
        let plain = CacheKeys::new("");
        assert_eq!(
            plain.record(id),
            "user:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(plain.results_table(), "user:param");

        let prefixed = CacheKeys::new("roster:");
        assert_eq!(prefixed.pagination_table(), "roster:user:pagination");
    }

    #[test]
    fn canonical_form_ignores_field_order() {
        let mut forward = Map::new();
        forward.insert("page".into(), json!(2));
        forward.insert("name".into(), json!("ann"));
        forward.insert("nested".into(), json!({"b": 1, "a": 2}));

        let mut backward = Map::new();
        backward.insert("nested".into(), json!({"a": 2, "b": 1}));
        backward.insert("name".into(), json!("ann"));
        backward.insert("page".into(), json!(2));

        let left = serde_json::to_string(&canonicalize(Value::Object(forward))).expect("json");
        let right = serde_json::to_string(&canonicalize(Value::Object(backward))).expect("json");
        assert_eq!(left, right);
        assert_eq!(left, r#"{"name":"ann","nested":{"a":2,"b":1},"page":2}"#);
    }

    #[test]
    fn equal_filters_share_a_field() {
        let a = UserFilter {
            name: Some("ann".into()),
            page: 2,
            ..Default::default()
        };
        let b = UserFilter {
            page: 2,
            name: Some("ann".into()),
            ..Default::default()
        };
        let other = UserFilter {
            page: 3,
            ..a.clone()
        };

        assert_eq!(filter_field(&a).expect("key"), filter_field(&b).expect("key"));
        assert_ne!(filter_field(&a).expect("key"), filter_field(&other).expect("key"));
    }
}
