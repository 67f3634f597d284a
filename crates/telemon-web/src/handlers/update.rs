//! 메트릭 수집 핸들러.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use telemon_core::models::metric::{Metric, MetricBatch, MetricKind, MetricValue};
use tracing::debug;

use super::{parse_json, store_metric};
use crate::error::ApiError;
use crate::AppState;

/// POST /update/{kind}/{name}/{value}
///
/// 경로 인코딩 단건 수집. 응답은 저장된 값의 텍스트.
pub async fn update_from_path(
    State(state): State<AppState>,
    Path((kind, name, raw)): Path<(String, String, String)>,
) -> Result<String, ApiError> {
    let kind: MetricKind = kind.parse()?;
    if name.is_empty() {
        return Err(ApiError::NotFound("메트릭 이름 누락".to_string()));
    }
    let value = MetricValue::parse(kind, &raw)?;

    let stored = store_metric(&state, Metric { id: name, value }).await?;
    Ok(stored.value.to_string())
}

/// POST /update/
///
/// JSON 단건 수집. 저장된 값을 JSON으로 돌려준다.
pub async fn update_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Metric>, ApiError> {
    let metric: Metric = parse_json(&body)?;
    let stored = store_metric(&state, metric).await?;
    Ok(Json(stored))
}

/// POST /updates/
///
/// 배치 병합. 응답은 병합 후 전체 메트릭 목록.
pub async fn update_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Metric>>, ApiError> {
    let batch: MetricBatch = parse_json(&body)?;
    debug!("배치 수신: {}개", batch.len());

    state.store.merge_batch(&batch).await?;
    state.after_mutation().await;

    let snapshot = state.store.list_all().await?;
    Ok(Json(snapshot.to_metrics()))
}
