//! 전송 결과 리포트 채널.
//!
//! 워커, 배치 전송, 샘플러는 직접 로그를 남기지 않고 결과를 이 채널에
//! 보낸다. 단일 소비 태스크([`ReportLogger`])가 모든 결과를 로깅한다.

use std::fmt;
use telemon_core::error::CoreError;
use telemon_core::models::metric::Metric;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 전송 레인
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// 단건 전송 (워커 풀, 큐가 가득 차면 드롭)
    Item,
    /// 배치 전송 (재시도 포함)
    Batch,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Item => f.write_str("item"),
            Lane::Batch => f.write_str("batch"),
        }
    }
}

/// 전송/수집 결과
#[derive(Debug)]
pub enum DeliveryReport {
    /// 단건 전송 성공. 서버가 돌려준 값 포함
    Delivered { echoed: Metric },
    /// 배치 전송 성공
    BatchDelivered { size: usize },
    /// 재시도 후 최종 실패
    Failed {
        lane: Lane,
        target: String,
        error: CoreError,
    },
    /// 큐가 가득 차 버려짐
    Dropped { id: String },
    /// 샘플러 실패
    SamplerFailed {
        sampler: &'static str,
        error: CoreError,
    },
}

pub type ReportSender = mpsc::UnboundedSender<DeliveryReport>;
pub type ReportReceiver = mpsc::UnboundedReceiver<DeliveryReport>;

/// 리포트 채널 생성
pub fn report_channel() -> (ReportSender, ReportReceiver) {
    mpsc::unbounded_channel()
}

/// 리포트 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub delivered: usize,
    pub batches: usize,
    pub failed: usize,
    pub dropped: usize,
    pub sampler_errors: usize,
}

/// 리포트 채널의 단일 소비자
pub struct ReportLogger {
    rx: ReportReceiver,
}

impl ReportLogger {
    pub fn new(rx: ReportReceiver) -> Self {
        Self { rx }
    }

    /// 모든 송신자가 닫힐 때까지 리포트를 로깅하고 집계를 반환
    pub async fn run(mut self) -> ReportSummary {
        let mut summary = ReportSummary::default();

        while let Some(report) = self.rx.recv().await {
            match report {
                DeliveryReport::Delivered { echoed } => {
                    summary.delivered += 1;
                    debug!("메트릭 전송 완료: {} = {}", echoed.id, echoed.value);
                }
                DeliveryReport::BatchDelivered { size } => {
                    summary.batches += 1;
                    info!("배치 전송 완료: {size}개 메트릭");
                }
                DeliveryReport::Failed {
                    lane,
                    target,
                    error,
                } => {
                    summary.failed += 1;
                    warn!("전송 실패 [{lane}] {target}: {error}");
                }
                DeliveryReport::Dropped { id } => {
                    summary.dropped += 1;
                    warn!("전송 큐 가득 참, 메트릭 드롭: {id}");
                }
                DeliveryReport::SamplerFailed { sampler, error } => {
                    summary.sampler_errors += 1;
                    warn!("{sampler} 샘플링 실패: {error}");
                }
            }
        }

        debug!("리포트 채널 종료: {summary:?}");
        summary
    }
}
