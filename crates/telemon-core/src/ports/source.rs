//! 디스패치용 메트릭 소스 포트.
//!
//! 구현: `telemon-monitor::cache::MetricCache`

use crate::models::metric::MetricBatch;

/// 디스패처가 읽는 메트릭 소스
pub trait MetricSource: Send + Sync {
    /// 현재 값을 배치로 복사한다. 구현체는 복사와 동시에
    /// 주기 카운터를 리셋할 수 있다.
    fn snapshot_for_dispatch(&self) -> MetricBatch;
}
