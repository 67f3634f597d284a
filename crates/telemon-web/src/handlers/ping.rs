//! 저장소 연결 확인 핸들러.

use axum::extract::State;
use axum::http::StatusCode;

use crate::error::ApiError;
use crate::AppState;

/// GET /ping
///
/// 저장소에 닿으면 200, 아니면 500.
pub async fn ping(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.ping().await?;
    Ok(StatusCode::OK)
}
