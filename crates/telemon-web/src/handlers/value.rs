//! 메트릭 조회 핸들러.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use telemon_core::models::metric::{Metric, MetricKind, MetricQuery};

use super::{lookup, parse_json};
use crate::error::ApiError;
use crate::AppState;

/// GET /value/{kind}/{name}
pub async fn value_from_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<String, ApiError> {
    let kind: MetricKind = kind.parse()?;
    let metric = lookup(&state, kind, &name).await?;
    Ok(metric.value.to_string())
}

/// POST /value/
pub async fn value_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Metric>, ApiError> {
    let query: MetricQuery = parse_json(&body)?;
    let metric = lookup(&state, query.kind, &query.id).await?;
    Ok(Json(metric))
}
