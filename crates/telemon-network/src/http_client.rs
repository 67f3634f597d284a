//! HTTP 메트릭 전송 클라이언트.
//!
//! `MetricSender` 포트 구현. 본문은 [`TransportCodec`]으로 서명/압축하고
//! 모든 요청은 [`retry`]로 감싼다.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use std::time::Duration;
use telemon_core::error::CoreError;
use telemon_core::models::metric::{Metric, MetricBatch};
use telemon_core::ports::sender::MetricSender;
use telemon_core::retry::{retry, RetryPolicy};
use tracing::debug;

use crate::codec::{Envelope, TransportCodec, SIGNATURE_HEADER};

/// reqwest 에러를 재시도 분류가 가능한 `CoreError`로 변환
fn classify(error: reqwest::Error, context: &str) -> CoreError {
    if error.is_timeout() {
        CoreError::Timeout(format!("{context}: {error}"))
    } else if error.is_body() || error.is_decode() {
        CoreError::TruncatedResponse(format!("{context}: {error}"))
    } else if error.is_connect() || error.is_request() {
        CoreError::Network(format!("{context}: {error}"))
    } else {
        CoreError::Internal(format!("{context}: {error}"))
    }
}

/// REST 전송 클라이언트 - `MetricSender` 포트 구현
pub struct HttpMetricSender {
    client: reqwest::Client,
    base_url: String,
    codec: TransportCodec,
    retry_policy: RetryPolicy,
}

impl HttpMetricSender {
    /// 새 전송 클라이언트 생성
    pub fn new(base_url: &str, codec: TransportCodec, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            codec,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// 재시도 정책 교체
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// 인코딩된 본문을 POST하고 응답 본문을 반환 (재시도 1회 단위)
    async fn post_envelope(&self, path: &str, envelope: &Envelope) -> Result<Vec<u8>, CoreError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(envelope.body.clone());

        if let Some(encoding) = envelope.content_encoding.header_value() {
            req = req.header(CONTENT_ENCODING, encoding);
        }
        if let Some(signature) = &envelope.signature {
            req = req.header(SIGNATURE_HEADER, signature);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| classify(e, &format!("{path} 요청 실패")))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| classify(e, &format!("{path} 응답 읽기 실패")))?;

        if !status.is_success() {
            return Err(CoreError::Http {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        Ok(body.to_vec())
    }
}

#[async_trait]
impl MetricSender for HttpMetricSender {
    async fn send_metric(&self, metric: &Metric) -> Result<Metric, CoreError> {
        debug!("메트릭 전송: {} ({})", metric.id, metric.kind());
        let envelope = self.codec.encode(metric)?;

        retry(&self.retry_policy, CoreError::is_transient_network, || async {
            let body = self.post_envelope("/update/", &envelope).await?;
            let echoed: Metric = serde_json::from_slice(&body)?;
            Ok(echoed)
        })
        .await
    }

    async fn send_batch(&self, batch: &MetricBatch) -> Result<(), CoreError> {
        debug!("배치 전송: {}개 메트릭", batch.len());
        let envelope = self.codec.encode(batch)?;

        retry(&self.retry_policy, CoreError::is_transient_network, || async {
            self.post_envelope("/updates/", &envelope).await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn sender(url: &str, key: Option<&str>) -> HttpMetricSender {
        HttpMetricSender::new(url, TransportCodec::from_key(key), Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(fast_retry())
    }

    /// 요청 헤더와 `Content-Length`만큼의 본문을 모두 읽는다
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    fn http_ok(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// 첫 연결은 선언한 길이보다 짧은 본문을 보내고 끊는다. 이후 연결은 정상 응답.
    async fn truncating_server(echo: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                read_request(&mut stream).await;

                let response = if attempt == 1 {
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                        echo.len() + 64,
                        &echo[..echo.len() / 2]
                    )
                } else {
                    http_ok(echo)
                };
                stream.write_all(response.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });

        (url, accepted)
    }

    #[test]
    fn trailing_slash_trimmed() {
        let client = sender("http://localhost:8080/", None);
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn send_metric_decodes_echo() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/update/")
            .match_header("content-encoding", "gzip")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"PollCount","type":"counter","delta":15}"#)
            .create_async()
            .await;

        let client = sender(&server.url(), None);
        let echoed = client
            .send_metric(&Metric::counter("PollCount", 5))
            .await
            .unwrap();

        assert_eq!(echoed, Metric::counter("PollCount", 15));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn signed_requests_carry_hash_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/updates/")
            .match_header(SIGNATURE_HEADER, Matcher::Regex("^[0-9a-f]{64}$".to_string()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = sender(&server.url(), Some("secret"));
        let batch = MetricBatch::new(vec![Metric::gauge("Alloc", 1.0)]);
        client.send_batch(&batch).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unsigned_requests_omit_hash_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/updates/")
            .match_header(SIGNATURE_HEADER, Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;

        let client = sender(&server.url(), None);
        client
            .send_batch(&MetricBatch::new(vec![Metric::counter("A", 1)]))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/update/")
            .with_status(400)
            .with_body("bad metric")
            .expect(1)
            .create_async()
            .await;

        let client = sender(&server.url(), None);
        let result = client.send_metric(&Metric::gauge("A", 1.0)).await;

        match result {
            Err(CoreError::Http { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad metric");
            }
            other => panic!("예상하지 못한 결과: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/updates/")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = sender(&server.url(), None);
        let result = client
            .send_batch(&MetricBatch::new(vec![Metric::counter("A", 1)]))
            .await;
        assert!(matches!(result, Err(CoreError::Http { status: 500, .. })));
        mock.assert_async().await;
    }

    #[test]
    fn connection_refused_is_retried_then_surfaced() {
        // 바인드 후 바로 닫아 연결 거부되는 포트 확보
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        // 3회 시도 = 50ms 대기 두 번
        let client = sender(&format!("http://{addr}"), None)
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(50)));
        let started = Instant::now();
        let result = tokio_test::block_on(client.send_metric(&Metric::gauge("A", 1.0)));

        assert!(matches!(result, Err(CoreError::Network(_))));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn truncated_response_is_retried_then_recovers() {
        let echo = r#"{"id":"PollCount","type":"counter","delta":15}"#;
        let (url, accepted) = truncating_server(echo).await;

        let client = sender(&url, None);
        let echoed = client
            .send_metric(&Metric::counter("PollCount", 5))
            .await
            .unwrap();

        assert_eq!(echoed, Metric::counter("PollCount", 15));
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn truncated_response_is_classified() {
        let (url, accepted) = truncating_server(r#"{"id":"A","type":"gauge","value":1}"#).await;

        let client = sender(&url, None).with_retry_policy(RetryPolicy::new(1, Duration::ZERO));
        let result = client.send_metric(&Metric::gauge("A", 1.0)).await;

        assert!(
            matches!(result, Err(CoreError::TruncatedResponse(_))),
            "{result:?}"
        );
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stalled_server_times_out_after_all_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    read_request(&mut stream).await;
                    // 응답 없이 연결만 붙잡고 있는다
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    drop(stream);
                });
            }
        });

        let client = HttpMetricSender::new(&url, TransportCodec::default(), Duration::from_millis(200))
            .unwrap()
            .with_retry_policy(fast_retry());
        let result = client
            .send_batch(&MetricBatch::new(vec![Metric::counter("A", 1)]))
            .await;

        assert!(matches!(result, Err(CoreError::Timeout(_))), "{result:?}");
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn malformed_echo_is_serialization_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/update/")
            .with_status(200)
            .with_body("not json")
            .expect(1)
            .create_async()
            .await;

        let client = sender(&server.url(), None);
        let result = client.send_metric(&Metric::gauge("A", 1.0)).await;
        assert!(matches!(result, Err(CoreError::Serialization(_))));
        mock.assert_async().await;
    }
}
