//! 세 백엔드가 같은 저장소 의미를 지키는지 검증하는 공통 테스트.

use std::sync::Arc;
use telemon_core::error::CoreError;
use telemon_core::models::metric::{Metric, MetricBatch};
use telemon_core::ports::store::MetricStore;
use telemon_storage::file::FileStorage;
use telemon_storage::memory::MemStorage;
use telemon_storage::sqlite::SqliteStorage;
use tempfile::TempDir;

/// 백엔드별 저장소 생성. TempDir는 테스트 동안 유지해야 한다.
fn backends(dir: &TempDir) -> Vec<(&'static str, Arc<dyn MetricStore>)> {
    vec![
        ("memory", Arc::new(MemStorage::new())),
        ("file", Arc::new(FileStorage::new(dir.path().join("metrics.json")))),
        (
            "sqlite",
            Arc::new(SqliteStorage::open(&dir.path().join("metrics.db")).unwrap()),
        ),
    ]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accumulation_is_order_independent() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        let tasks = (1..=50i64).map(|delta| {
            let store = store.clone();
            tokio::spawn(async move { store.accumulate_counter("hits", delta).await })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert_eq!(
            store.get_counter("hits").await.unwrap(),
            Some((1..=50).sum::<i64>()),
            "{name}"
        );
    }
}

#[tokio::test]
async fn gauge_last_write_wins() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        store.set_gauge("Alloc", 11.0).await.unwrap();
        store.set_gauge("Alloc", 7.0).await.unwrap();
        assert_eq!(store.get_gauge("Alloc").await.unwrap(), Some(7.0), "{name}");
    }
}

#[tokio::test]
async fn poll_count_reported_twice_sums() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        store.accumulate_counter("PollCount", 5).await.unwrap();
        store.accumulate_counter("PollCount", 5).await.unwrap();
        assert_eq!(store.get_counter("PollCount").await.unwrap(), Some(10), "{name}");
    }
}

#[tokio::test]
async fn batch_with_repeated_counter_sums() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        let batch = MetricBatch::new(vec![Metric::counter("A", 3), Metric::counter("A", 4)]);
        store.merge_batch(&batch).await.unwrap();
        assert_eq!(store.get_counter("A").await.unwrap(), Some(7), "{name}");
    }
}

#[tokio::test]
async fn counter_overflow_is_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        // 배치 내부 합산에서 넘침
        let batch = MetricBatch::new(vec![Metric::counter("A", i64::MAX), Metric::counter("A", 1)]);
        assert!(
            matches!(store.merge_batch(&batch).await, Err(CoreError::InvalidMetric(_))),
            "{name}"
        );
        assert_eq!(store.get_counter("A").await.unwrap(), None, "{name}");

        // 저장된 합계와 더할 때 넘침
        store.accumulate_counter("A", i64::MAX).await.unwrap();
        assert!(
            matches!(store.accumulate_counter("A", 1).await, Err(CoreError::InvalidMetric(_))),
            "{name}"
        );
        let batch = MetricBatch::new(vec![Metric::gauge("G", 1.0), Metric::counter("A", 1)]);
        assert!(
            matches!(store.merge_batch(&batch).await, Err(CoreError::InvalidMetric(_))),
            "{name}"
        );

        // 실패 후에도 조회와 목록은 정상
        assert_eq!(store.get_counter("A").await.unwrap(), Some(i64::MAX), "{name}");
        let snapshot = store.list_all().await.unwrap();
        assert_eq!(snapshot.counters["A"], i64::MAX, "{name}");
        assert!(!snapshot.gauges.contains_key("G"), "{name}");
        assert_eq!(store.accumulate_counter("A", -1).await.unwrap(), i64::MAX - 1, "{name}");
    }
}

#[tokio::test]
async fn merging_twice_doubles_counters_only() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        let batch = MetricBatch::new(vec![
            Metric::counter("PollCount", 5),
            Metric::gauge("Alloc", 2.5),
        ]);
        store.merge_batch(&batch).await.unwrap();
        let once = store.list_all().await.unwrap();
        store.merge_batch(&batch).await.unwrap();
        let twice = store.list_all().await.unwrap();

        assert_eq!(twice.gauges, once.gauges, "{name}");
        assert_eq!(twice.counters["PollCount"], 2 * once.counters["PollCount"], "{name}");
    }
}

#[tokio::test]
async fn snapshot_restore_is_identity() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        store.set_gauge("Alloc", 7.25).await.unwrap();
        store.set_gauge("RandomValue", 123456.789).await.unwrap();
        store.accumulate_counter("PollCount", 42).await.unwrap();
        let before = store.list_all().await.unwrap();
        let bytes = store.snapshot().await.unwrap();

        // 상태를 어지럽힌 뒤 복원
        store.accumulate_counter("PollCount", 1).await.unwrap();
        store.set_gauge("Extra", 1.0).await.unwrap();
        store.restore(&bytes).await.unwrap();

        assert_eq!(store.list_all().await.unwrap(), before, "{name}");
    }
}

#[tokio::test]
async fn snapshot_moves_between_backends() {
    let dir = TempDir::new().unwrap();
    let source = MemStorage::new();
    source.set_gauge("Alloc", 1.5).await.unwrap();
    source.accumulate_counter("PollCount", 9).await.unwrap();
    let bytes = source.snapshot().await.unwrap();

    let target = SqliteStorage::open(&dir.path().join("copy.db")).unwrap();
    target.restore(&bytes).await.unwrap();
    assert_eq!(target.list_all().await.unwrap(), source.list_all().await.unwrap());
}

#[tokio::test]
async fn every_backend_answers_ping() {
    let dir = TempDir::new().unwrap();
    for (name, store) in backends(&dir) {
        assert!(store.ping().await.is_ok(), "{name}");
    }
}
