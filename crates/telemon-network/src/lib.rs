//! # telemon-network
//!
//! 에이전트 측 전송 파이프라인과 양쪽이 공유하는 전송 코덱.
//!
//! - [`codec`]: JSON → HMAC 서명 → gzip (수신 측은 역순)
//! - [`http_client`]: `MetricSender` 포트 구현 (reqwest)
//! - [`worker_pool`]: 단건 전송용 고정 워커 + 유한 큐 (가득 차면 드롭)
//! - [`dispatcher`]: 캐시 스냅샷을 단건 레인과 배치 레인으로 분배
//! - [`report`]: 전송 결과를 한 곳에서 로깅하는 리포트 채널

pub mod codec;
pub mod compression;
pub mod dispatcher;
pub mod http_client;
pub mod report;
pub mod signing;
pub mod worker_pool;
