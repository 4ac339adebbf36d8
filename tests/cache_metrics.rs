mod support;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serial_test::serial;
use todo_cache::cache::{CacheClient, MemoryCache, derive_key};
use todo_cache::domain::{NewTodo, TodoFilter, TodoPagination};
use todo_cache::infra::memory::InMemoryTodoStore;
use todo_cache::infra::telemetry;
use uuid::Uuid;

use support::{BrokenCache, repository};

fn snapshotter() -> &'static Snapshotter {
    static SNAPSHOTTER: OnceLock<Snapshotter> = OnceLock::new();
    SNAPSHOTTER.get_or_init(|| {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        recorder
            .install()
            .expect("debug metrics recorder should install in this test process");
        telemetry::describe_metrics();
        snapshotter
    })
}

/// Counter totals by metric name, summed across label sets; histograms report
/// their sample count.
fn totals() -> HashMap<String, u64> {
    let mut totals = HashMap::new();
    for (composite_key, _, _, value) in snapshotter().snapshot().into_vec() {
        let amount = match value {
            DebugValue::Counter(value) => value,
            DebugValue::Histogram(samples) => samples.len() as u64,
            DebugValue::Gauge(_) => 0,
        };
        *totals
            .entry(composite_key.key().name().to_string())
            .or_insert(0) += amount;
    }
    totals
}

fn total(snapshot: &HashMap<String, u64>, name: &str) -> u64 {
    snapshot.get(name).copied().unwrap_or(0)
}

#[tokio::test]
#[serial]
async fn read_and_write_paths_emit_expected_metric_keys() {
    snapshotter();
    let _ = totals();

    let cache = Arc::new(support::memory_cache());
    let repository = repository(Arc::new(InMemoryTodoStore::new()), cache.clone());
    let owner = Uuid::new_v4();

    repository
        .create(NewTodo::new(owner, "a"))
        .await
        .expect("create");
    repository.find_all(owner, None, None).await.expect("miss");
    repository.find_all(owner, None, None).await.expect("hit");

    let key = derive_key(owner, &TodoFilter::completed(false), &TodoPagination::default());
    cache
        .set(&key, b"garbage".to_vec(), Duration::from_secs(60))
        .await
        .expect("plant corrupt entry");
    repository
        .find_all(owner, Some(&TodoFilter::completed(false)), None)
        .await
        .expect("decode failure falls through");

    let snapshot = totals();
    for metric in [
        "todo_cache_hit_total",
        "todo_cache_miss_total",
        "todo_cache_decode_error_total",
        "todo_cache_invalidate_total",
        "todo_store_query_ms",
    ] {
        assert!(total(&snapshot, metric) >= 1, "missing metric: {metric}");
    }
}

#[tokio::test]
#[serial]
async fn cache_failures_are_counted() {
    snapshotter();
    let _ = totals();

    let repository = repository(
        Arc::new(InMemoryTodoStore::new()),
        Arc::new(BrokenCache { delay: None }),
    );
    let owner = Uuid::new_v4();

    repository
        .create(NewTodo::new(owner, "a"))
        .await
        .expect("create");
    repository.find_all(owner, None, None).await.expect("read");

    let snapshot = totals();
    // create: delete_by_prefix; read: exists fails, then set fails.
    assert!(total(&snapshot, "todo_cache_error_total") >= 3);
    assert!(total(&snapshot, "todo_cache_miss_total") >= 1);
}

#[tokio::test]
#[serial]
async fn capacity_evictions_are_counted() {
    snapshotter();
    let _ = totals();

    let cache = MemoryCache::new(std::num::NonZeroUsize::MIN);
    let ttl = Duration::from_secs(60);
    cache.set("todos:a:1", Vec::new(), ttl).await.expect("set");
    cache.set("todos:a:1", Vec::new(), ttl).await.expect("overwrite");
    cache.set("todos:a:2", Vec::new(), ttl).await.expect("evicting set");

    let snapshot = totals();
    assert!(total(&snapshot, "todo_cache_evict_total") >= 1);
}
