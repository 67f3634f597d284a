//! 디스패치 대기 메트릭 캐시.
//!
//! 런타임 슬라이스와 호스트 슬라이스를 별도 잠금으로 보호한다.
//! 각 샘플러는 자기 슬라이스에만 쓰고, 디스패처만 두 슬라이스를 읽는다.

use parking_lot::Mutex;
use std::collections::HashMap;
use telemon_core::models::metric::{Metric, MetricBatch};
use telemon_core::ports::source::MetricSource;

/// 런타임 틱마다 1 증가하는 counter 이름
pub const POLL_COUNT: &str = "PollCount";

#[derive(Debug, Default)]
struct RuntimeSlice {
    gauges: HashMap<String, f64>,
    poll_count: i64,
}

#[derive(Debug, Default)]
struct HostSlice {
    gauges: HashMap<String, f64>,
}

/// 샘플러가 쓰고 디스패처가 읽는 최신 메트릭 캐시
#[derive(Debug, Default)]
pub struct MetricCache {
    runtime: Mutex<RuntimeSlice>,
    host: Mutex<HostSlice>,
}

impl MetricCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 런타임 gauge 기록 + PollCount 1 증가
    pub fn record_runtime<I>(&self, gauges: I)
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut slice = self.runtime.lock();
        slice.gauges.extend(gauges);
        slice.poll_count += 1;
    }

    /// 호스트 gauge 기록
    pub fn record_host<I>(&self, gauges: I)
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        self.host.lock().gauges.extend(gauges);
    }

    /// 현재 PollCount
    pub fn poll_count(&self) -> i64 {
        self.runtime.lock().poll_count
    }

    /// 두 슬라이스를 복사해 배치로 만들고 PollCount를 0으로 되돌린다.
    ///
    /// 샘플이 하나라도 있으면 PollCount는 0이어도 항상 포함한다.
    /// 아무것도 기록되지 않은 캐시는 빈 배치를 돌려준다.
    ///
    /// 리셋은 전송 확인 전에 일어나므로 전송이 실패하면 그 주기의
    /// PollCount는 서버에 반영되지 않는다.
    pub fn take_snapshot(&self) -> MetricBatch {
        // 잠금 순서: runtime → host
        let mut runtime = self.runtime.lock();
        let host = self.host.lock();

        let mut metrics: Vec<Metric> =
            Vec::with_capacity(runtime.gauges.len() + host.gauges.len() + 1);
        metrics.extend(runtime.gauges.iter().map(|(id, v)| Metric::gauge(id.clone(), *v)));
        metrics.extend(host.gauges.iter().map(|(id, v)| Metric::gauge(id.clone(), *v)));
        if !metrics.is_empty() || runtime.poll_count > 0 {
            metrics.push(Metric::counter(POLL_COUNT, runtime.poll_count));
        }
        runtime.poll_count = 0;

        MetricBatch::new(metrics)
    }
}

impl MetricSource for MetricCache {
    fn snapshot_for_dispatch(&self) -> MetricBatch {
        self.take_snapshot()
    }
}
