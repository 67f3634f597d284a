//! 메트릭 전송 포트.
//!
//! 구현: `telemon-network::http_client::HttpMetricSender`

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::metric::{Metric, MetricBatch};

/// 서버로 메트릭을 보내는 전송 계층
#[async_trait]
pub trait MetricSender: Send + Sync {
    /// 단일 메트릭 전송, 서버가 저장한 값을 반환
    async fn send_metric(&self, metric: &Metric) -> Result<Metric, CoreError>;

    /// 배치 전송
    async fn send_batch(&self, batch: &MetricBatch) -> Result<(), CoreError>;
}
