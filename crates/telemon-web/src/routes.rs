//! API 라우트 정의.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::middleware::decode_request;
use crate::AppState;

/// 메트릭 라우트 생성. 요청 본문은 라우팅 후 해제/검증된다.
pub fn metric_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // 수집
        .route(
            "/update/{kind}/{name}/{value}",
            post(handlers::update::update_from_path),
        )
        .route("/update/", post(handlers::update::update_json))
        .route("/updates/", post(handlers::update::update_batch))
        // 조회
        .route("/value/{kind}/{name}", get(handlers::value::value_from_path))
        .route("/value/", post(handlers::value::value_json))
        // 상태
        .route("/", get(handlers::root::list_metrics))
        .route("/ping", get(handlers::ping::ping))
        .route_layer(axum::middleware::from_fn_with_state(state, decode_request))
}
