//! API 에러 처리.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use telemon_core::error::CoreError;
use thiserror::Error;

/// API 에러
#[derive(Debug, Error)]
pub enum ApiError {
    /// 내부 서버 오류 (저장소 불가 포함)
    #[error("내부 서버 오류: {0}")]
    Internal(String),

    /// 메트릭을 찾을 수 없음
    #[error("메트릭을 찾을 수 없음: {0}")]
    NotFound(String),

    /// 잘못된 요청 (형식 오류, 서명 불일치)
    #[error("잘못된 요청: {0}")]
    BadRequest(String),
}

/// 에러 응답 본문
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// 에러 메시지
    pub error: String,
    /// HTTP 상태 코드
    pub status: u16,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(msg) | ApiError::NotFound(msg) | ApiError::BadRequest(msg) => msg,
        };

        let body = ErrorResponse {
            error: message,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidMetric(_)
            | CoreError::Serialization(_)
            | CoreError::SignatureMismatch => ApiError::BadRequest(err.to_string()),
            CoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_mapping() {
        let cases = [
            (CoreError::InvalidMetric("x".to_string()), StatusCode::BAD_REQUEST),
            (CoreError::SignatureMismatch, StatusCode::BAD_REQUEST),
            (
                CoreError::NotFound {
                    kind: "gauge".to_string(),
                    id: "A".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (CoreError::Storage("down".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                CoreError::StorageBusy("locked".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn error_display() {
        let err = ApiError::NotFound("gauge Alloc".to_string());
        assert!(err.to_string().contains("Alloc"));
    }
}
