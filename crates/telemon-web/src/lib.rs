//! # telemon-web
//!
//! 서버 측 HTTP 표면.
//! Axum 기반 메트릭 수집/조회 API + 상태 페이지.
//!
//! ## 기능
//! - 단건/배치 메트릭 수집 (JSON, 경로 인코딩)
//! - 메트릭 값 조회 (JSON, 텍스트)
//! - 요청 gzip 해제 + HMAC 서명 검증, 응답 gzip
//! - 저장소 연결 확인 (`/ping`)

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use telemon_core::lifecycle::shutdown_requested;
use telemon_core::ports::store::MetricStore;
use telemon_network::codec::TransportCodec;
use telemon_storage::persistence::PersistenceScheduler;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// 웹 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 메트릭 저장소
    pub store: Arc<dyn MetricStore>,
    /// 요청 본문 해제/서명 검증 코덱
    pub codec: TransportCodec,
    /// 변경 후 동기 저장용 스케줄러
    pub persistence: PersistenceScheduler,
}

impl AppState {
    /// 변경 직후 호출. 동기 저장 실패는 요청을 실패시키지 않는다.
    pub async fn after_mutation(&self) {
        if let Err(e) = self.persistence.after_mutation().await {
            warn!("변경 후 저장 실패: {e}");
        }
    }
}

/// 상태를 주입한 전체 라우터 생성
pub fn app(state: AppState) -> Router {
    routes::metric_routes(state.clone())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::encode_response,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 메트릭 API 서버
pub struct WebServer {
    addr: String,
    state: AppState,
}

impl WebServer {
    /// 새 웹 서버 생성
    pub fn new(addr: impl Into<String>, state: AppState) -> Self {
        Self {
            addr: addr.into(),
            state,
        }
    }

    /// 서버 실행. 주소는 호스트 이름도 허용하며 바인드 실패는 즉시 에러로 반환한다.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.addr.as_str())
            .await
            .map_err(|e| std::io::Error::new(e.kind(), format!("바인드 실패 {}: {e}", self.addr)))?;
        info!("메트릭 서버 시작: http://{}", listener.local_addr()?);

        axum::serve(listener, app(self.state))
            .with_graceful_shutdown(async move {
                shutdown_requested(&mut shutdown_rx).await;
                info!("웹 서버 종료 신호 수신");
            })
            .await?;

        info!("메트릭 서버 종료");
        Ok(())
    }
}
