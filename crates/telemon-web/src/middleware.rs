//! 요청/응답 본문 변환 미들웨어.
//!
//! 요청: gzip 해제 → 서명 검증 → 원본 JSON으로 교체.
//! 응답: 원본 본문 서명 → `Accept-Encoding: gzip`이면 압축.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use telemon_network::codec::{ContentEncoding, GZIP, SIGNATURE_HEADER};
use telemon_network::compression;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// 요청 본문 최대 크기
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `Accept-Encoding`에 gzip이 있는지
fn accepts_gzip(headers: &HeaderMap) -> bool {
    ContentEncoding::from_header(header_str(headers, header::ACCEPT_ENCODING.as_str()))
        == ContentEncoding::Gzip
}

/// 요청 본문 해제 + 서명 검증. 본문이 없는 요청은 그대로 통과한다.
pub async fn decode_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("요청 본문 읽기 실패 {}: {e}", parts.uri.path());
            return ApiError::BadRequest(format!("요청 본문 읽기 실패: {e}")).into_response();
        }
    };

    if bytes.is_empty() {
        return next.run(Request::from_parts(parts, Body::empty())).await;
    }

    let encoding =
        ContentEncoding::from_header(header_str(&parts.headers, header::CONTENT_ENCODING.as_str()));
    let decoded = state.codec.decode(
        &bytes,
        encoding,
        header_str(&parts.headers, SIGNATURE_HEADER),
    );

    let raw = match decoded {
        Ok(raw) => raw,
        Err(e) => {
            warn!("요청 본문 거부 {}: {e}", parts.uri.path());
            return ApiError::from(e).into_response();
        }
    };

    parts.headers.remove(header::CONTENT_ENCODING);
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(raw.len()));
    next.run(Request::from_parts(parts, Body::from(raw))).await
}

/// 응답 서명 + 압축. 실패 응답은 요청 경로와 함께 기록한다.
pub async fn encode_response(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let gzip_ok = accepts_gzip(request.headers());

    let response = next.run(request).await;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        warn!("요청 실패 {path}: {status}");
    }

    let (mut parts, body) = response.into_parts();
    let raw = match to_bytes(body, usize::MAX).await {
        Ok(raw) => raw,
        Err(e) => {
            return ApiError::Internal(format!("응답 본문 읽기 실패: {e}")).into_response();
        }
    };

    match state.codec.sign(&raw) {
        Ok(Some(signature)) => {
            let name = HeaderName::from_bytes(SIGNATURE_HEADER.as_bytes());
            match (name, HeaderValue::from_str(&signature)) {
                (Ok(name), Ok(value)) => {
                    parts.headers.insert(name, value);
                }
                _ => warn!("서명 헤더 생성 실패"),
            }
        }
        Ok(None) => {}
        Err(e) => warn!("응답 서명 실패: {e}"),
    }

    let mut encoding = ContentEncoding::Identity;
    let body = if gzip_ok && !raw.is_empty() && !parts.headers.contains_key(header::CONTENT_ENCODING)
    {
        match compression::gzip(&raw) {
            Ok(compressed) => {
                encoding = ContentEncoding::Gzip;
                parts
                    .headers
                    .insert(header::CONTENT_ENCODING, HeaderValue::from_static(GZIP));
                compressed
            }
            Err(e) => {
                warn!("응답 압축 실패, 원본 전송: {e}");
                raw.to_vec()
            }
        }
    } else {
        raw.to_vec()
    };

    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

    debug!(
        path = %path,
        status = status.as_u16(),
        size = body.len(),
        encoding = ?encoding,
        "응답 기록"
    );

    Response::from_parts(parts, Body::from(body))
}
