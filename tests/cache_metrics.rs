mod support;

use std::collections::HashSet;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use roster::application::repos::{CacheControl, UserFilter};

use support::{MemoryUsers, UnreachableBackend, memory_cache, result_cache, service};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = Arc::new(MemoryUsers::new());
    let ann = store.seed("Ann", 31).await;

    // Record miss then hit, listing miss then hit.
    let users = service(&store, &memory_cache());
    users.find_by_id(ann.id).await.expect("miss path");
    users.find_by_id(ann.id).await.expect("hit path");
    let filter = UserFilter::default();
    users
        .list(&filter, CacheControl::default())
        .await
        .expect("listing miss");
    users
        .list(&filter, CacheControl::default())
        .await
        .expect("listing hit");

    // Backend failures.
    let degraded = service(&store, &result_cache(Arc::new(UnreachableBackend)));
    degraded
        .list(&filter, CacheControl::default())
        .await
        .expect("served from store");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "roster_cache_record_hit_total",
        "roster_cache_record_miss_total",
        "roster_cache_query_hit_total",
        "roster_cache_query_miss_total",
        "roster_cache_error_total",
        "roster_store_read_total",
        "roster_list_users_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
