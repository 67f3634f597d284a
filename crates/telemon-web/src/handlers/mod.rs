//! API 핸들러 모듈.

pub mod ping;
pub mod root;
pub mod update;
pub mod value;

use telemon_core::error::CoreError;
use telemon_core::models::metric::{Metric, MetricKind, MetricValue};

use crate::error::ApiError;
use crate::AppState;

/// 메트릭 1개 저장 후 저장된 값 반환. counter는 누적 합계를 돌려준다.
pub(crate) async fn store_metric(state: &AppState, metric: Metric) -> Result<Metric, ApiError> {
    let stored = match metric.value {
        MetricValue::Gauge(value) => {
            state.store.set_gauge(&metric.id, value).await?;
            metric
        }
        MetricValue::Counter(delta) => {
            let total = state.store.accumulate_counter(&metric.id, delta).await?;
            Metric::counter(metric.id, total)
        }
    };

    state.after_mutation().await;
    Ok(stored)
}

/// 종류와 이름으로 메트릭 조회
pub(crate) async fn lookup(state: &AppState, kind: MetricKind, id: &str) -> Result<Metric, ApiError> {
    let value = match kind {
        MetricKind::Gauge => state.store.get_gauge(id).await?.map(MetricValue::Gauge),
        MetricKind::Counter => state.store.get_counter(id).await?.map(MetricValue::Counter),
    };

    value
        .map(|value| Metric {
            id: id.to_string(),
            value,
        })
        .ok_or_else(|| {
            CoreError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            }
            .into()
        })
}

/// 본문 JSON 파싱. 형식 오류는 400
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| CoreError::from(e).into())
}
