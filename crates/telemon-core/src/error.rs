//! Telemon 핵심 에러 타입.
//!
//! 어댑터 crate는 자체 에러를 `CoreError`로 변환하여 포트 경계를 넘긴다.
//! HTTP 계층은 `telemon-web::error::ApiError`로 다시 매핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 메트릭 (알 수 없는 타입, 값 누락, 파싱 실패)
    #[error("잘못된 메트릭: {0}")]
    InvalidMetric(String),

    /// 메트릭을 찾을 수 없음
    #[error("{kind} 메트릭 미발견: {id}")]
    NotFound {
        /// 메트릭 종류 ("gauge", "counter")
        kind: String,
        /// 메트릭 이름
        id: String,
    },

    /// 본문 서명 불일치 (누락 포함)
    #[error("서명 불일치")]
    SignatureMismatch,

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 네트워크 에러 (연결 실패, 연결 리셋)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("타임아웃: {0}")]
    Timeout(String),

    /// 응답 스트림이 중간에 끊김 (EOF)
    #[error("응답 중단: {0}")]
    TruncatedResponse(String),

    /// 피어가 반환한 애플리케이션 에러 (4xx/5xx)
    #[error("HTTP 에러 ({status}): {message}")]
    Http {
        /// 응답 상태 코드
        status: u16,
        /// 응답 본문
        message: String,
    },

    /// 저장소 에러 (재시도 불가)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 저장소 일시 잠금 (재시도 가능)
    #[error("저장소 사용 중: {0}")]
    StorageBusy(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 네트워크 전송 중 재시도 가능한 에러인지 판별
    ///
    /// 타임아웃, 연결 리셋, 응답 중단만 재시도한다.
    pub fn is_transient_network(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_) | CoreError::Timeout(_) | CoreError::TruncatedResponse(_)
        )
    }

    /// 저장소 드라이버의 일시적 에러인지 판별
    pub fn is_transient_storage(&self) -> bool {
        matches!(self, CoreError::StorageBusy(_))
    }
}
