//! 저장소 스냅샷 모델.
//!
//! 파일 백엔드의 디스크 포맷이기도 하다: `{"gauges": {..}, "counters": {..}}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metric::{Metric, MetricBatch, MetricKind, MetricValue};
use crate::error::CoreError;

/// counter 합산. `i64` 범위를 넘으면 `InvalidMetric`
pub fn checked_accumulate(id: &str, total: i64, delta: i64) -> Result<i64, CoreError> {
    total
        .checked_add(delta)
        .ok_or_else(|| CoreError::InvalidMetric(format!("counter 합계 범위 초과: {id}")))
}

/// 알려진 모든 메트릭의 시점 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    /// gauge 이름 → 마지막 값
    #[serde(default)]
    pub gauges: BTreeMap<String, f64>,
    /// counter 이름 → 누적 합계
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
}

impl StorageSnapshot {
    pub fn len(&self) -> usize {
        self.gauges.len() + self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty() && self.counters.is_empty()
    }

    /// 종류와 이름으로 값 조회
    pub fn get(&self, kind: MetricKind, id: &str) -> Option<MetricValue> {
        match kind {
            MetricKind::Gauge => self.gauges.get(id).copied().map(MetricValue::Gauge),
            MetricKind::Counter => self.counters.get(id).copied().map(MetricValue::Counter),
        }
    }

    /// 사전 집계된 배치 적용: gauge는 덮어쓰기, counter는 합산.
    ///
    /// 합계 하나라도 범위를 넘으면 아무것도 바꾸지 않는다.
    pub fn apply(&mut self, agg: AggregatedBatch) -> Result<(), CoreError> {
        let totals = agg
            .counters
            .into_iter()
            .map(|(id, delta)| {
                let current = self.counters.get(&id).copied().unwrap_or(0);
                checked_accumulate(&id, current, delta).map(|total| (id, total))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.gauges.extend(agg.gauges);
        self.counters.extend(totals);
        Ok(())
    }

    /// 메트릭 목록으로 변환 (gauge 먼저, 이름순)
    pub fn to_metrics(&self) -> Vec<Metric> {
        self.gauges
            .iter()
            .map(|(id, v)| Metric::gauge(id.clone(), *v))
            .chain(
                self.counters
                    .iter()
                    .map(|(id, d)| Metric::counter(id.clone(), *d)),
            )
            .collect()
    }
}

/// 배치를 종류별로 사전 집계한 결과.
///
/// counter는 이름별 delta 합, gauge는 이름별 마지막 값.
/// 다중 행 upsert 한 번에 같은 키가 두 번 나오지 않도록 한다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedBatch {
    pub gauges: BTreeMap<String, f64>,
    pub counters: BTreeMap<String, i64>,
}

impl TryFrom<&MetricBatch> for AggregatedBatch {
    type Error = CoreError;

    fn try_from(batch: &MetricBatch) -> Result<Self, Self::Error> {
        let mut agg = AggregatedBatch::default();
        for metric in batch.iter() {
            match metric.value {
                MetricValue::Gauge(v) => {
                    agg.gauges.insert(metric.id.clone(), v);
                }
                MetricValue::Counter(d) => {
                    let total = agg.counters.entry(metric.id.clone()).or_insert(0);
                    *total = checked_accumulate(&metric.id, *total, d)?;
                }
            }
        }
        Ok(agg)
    }
}
