//! 메모리 저장소.
//!
//! 단일 `RwLock`으로 gauge/counter 맵을 보호한다. 읽기끼리는 막지 않는다.

use async_trait::async_trait;
use parking_lot::RwLock;
use telemon_core::error::CoreError;
use telemon_core::models::metric::MetricBatch;
use telemon_core::models::snapshot::{checked_accumulate, AggregatedBatch, StorageSnapshot};
use telemon_core::ports::store::{MetricStore, StorageBackend};
use tracing::debug;

/// 휘발성 메모리 저장소 - `MetricStore` 포트 구현
#[derive(Debug, Default)]
pub struct MemStorage {
    state: RwLock<StorageSnapshot>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn current(&self) -> StorageSnapshot {
        self.state.read().clone()
    }

    pub(crate) fn replace(&self, snapshot: StorageSnapshot) {
        *self.state.write() = snapshot;
    }

    pub(crate) fn gauge(&self, id: &str) -> Option<f64> {
        self.state.read().gauges.get(id).copied()
    }

    pub(crate) fn counter(&self, id: &str) -> Option<i64> {
        self.state.read().counters.get(id).copied()
    }

    pub(crate) fn put_gauge(&self, id: &str, value: f64) {
        self.state.write().gauges.insert(id.to_string(), value);
    }

    /// 범위를 넘으면 기존 합계를 그대로 둔다
    pub(crate) fn add_counter(&self, id: &str, delta: i64) -> Result<i64, CoreError> {
        let mut state = self.state.write();
        let total = state.counters.entry(id.to_string()).or_insert(0);
        *total = checked_accumulate(id, *total, delta)?;
        Ok(*total)
    }

    /// 사전 집계 후 한 번의 쓰기 잠금으로 적용
    pub(crate) fn merge(&self, batch: &MetricBatch) -> Result<(), CoreError> {
        let agg = AggregatedBatch::try_from(batch)?;
        self.state.write().apply(agg)
    }
}

#[async_trait]
impl MetricStore for MemStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    async fn get_gauge(&self, id: &str) -> Result<Option<f64>, CoreError> {
        Ok(self.gauge(id))
    }

    async fn set_gauge(&self, id: &str, value: f64) -> Result<(), CoreError> {
        self.put_gauge(id, value);
        Ok(())
    }

    async fn get_counter(&self, id: &str) -> Result<Option<i64>, CoreError> {
        Ok(self.counter(id))
    }

    async fn accumulate_counter(&self, id: &str, delta: i64) -> Result<i64, CoreError> {
        self.add_counter(id, delta)
    }

    async fn list_all(&self) -> Result<StorageSnapshot, CoreError> {
        Ok(self.current())
    }

    async fn merge_batch(&self, batch: &MetricBatch) -> Result<(), CoreError> {
        self.merge(batch)?;
        debug!("배치 병합: {}개 메트릭", batch.len());
        Ok(())
    }

    async fn restore(&self, data: &[u8]) -> Result<(), CoreError> {
        let snapshot: StorageSnapshot = serde_json::from_slice(data)?;
        self.replace(snapshot);
        Ok(())
    }

    async fn persist(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn load(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemon_core::models::metric::Metric;

    #[tokio::test]
    async fn counters_accumulate() {
        let store = MemStorage::new();
        assert_eq!(store.accumulate_counter("PollCount", 5).await.unwrap(), 5);
        assert_eq!(store.accumulate_counter("PollCount", 5).await.unwrap(), 10);
        assert_eq!(store.get_counter("PollCount").await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn unknown_metric_is_none() {
        let store = MemStorage::new();
        assert_eq!(store.get_gauge("nope").await.unwrap(), None);
        assert_eq!(store.get_counter("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn gauge_and_counter_namespaces_are_separate() {
        let store = MemStorage::new();
        store.set_gauge("X", 1.5).await.unwrap();
        store.accumulate_counter("X", 2).await.unwrap();
        assert_eq!(store.get_gauge("X").await.unwrap(), Some(1.5));
        assert_eq!(store.get_counter("X").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn restore_rejects_garbage() {
        let store = MemStorage::new();
        store.set_gauge("A", 1.0).await.unwrap();
        assert!(store.restore(b"{not json").await.is_err());
        // 실패한 복원은 기존 상태를 건드리지 않는다
        assert_eq!(store.get_gauge("A").await.unwrap(), Some(1.0));
    }

    #[tokio::test]
    async fn merge_uses_last_gauge_in_batch() {
        let store = MemStorage::new();
        let batch = MetricBatch::new(vec![Metric::gauge("G", 1.0), Metric::gauge("G", 9.0)]);
        store.merge_batch(&batch).await.unwrap();
        assert_eq!(store.get_gauge("G").await.unwrap(), Some(9.0));
    }
}
