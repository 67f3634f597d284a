//! 전송 디스패처.
//!
//! 전송 주기마다 캐시 스냅샷을 두 레인으로 분배한다.
//! - 단건 레인: 워커 풀 큐에 넣기, 가득 차면 드롭 (최선 노력)
//! - 배치 레인: 별도 태스크가 배치 한 건을 재시도와 함께 전송
//!
//! 틱은 배치 전송이 끝날 때까지 기다린 뒤 다음 주기를 잰다.
//! 전송이 주기보다 길면 다음 틱은 건너뛰지 않고 늦춰진다.

use std::sync::Arc;
use std::time::Duration;
use telemon_core::models::metric::MetricBatch;
use telemon_core::ports::sender::MetricSender;
use telemon_core::ports::source::MetricSource;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::report::{DeliveryReport, Lane, ReportSender};
use crate::worker_pool::{OfferOutcome, SendWorkerPool};

/// 배치 레인 - 배치 한 건을 재시도 포함 전송
#[derive(Clone)]
pub struct BatchLane {
    sender: Arc<dyn MetricSender>,
    reports: ReportSender,
}

impl BatchLane {
    pub fn new(sender: Arc<dyn MetricSender>, reports: ReportSender) -> Self {
        Self { sender, reports }
    }

    /// 배치 전송 후 결과를 리포트. 성공 여부 반환.
    pub async fn deliver(&self, batch: MetricBatch) -> bool {
        let size = batch.len();
        let report = match self.sender.send_batch(&batch).await {
            Ok(()) => DeliveryReport::BatchDelivered { size },
            Err(error) => DeliveryReport::Failed {
                lane: Lane::Batch,
                target: format!("batch({size})"),
                error,
            },
        };
        let delivered = matches!(report, DeliveryReport::BatchDelivered { .. });
        let _ = self.reports.send(report);
        delivered
    }
}

/// 한 틱의 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub batch_size: usize,
    pub offered: OfferOutcome,
    pub batch_delivered: bool,
}

/// 주기적 전송 디스패처
pub struct Dispatcher {
    source: Arc<dyn MetricSource>,
    items: SendWorkerPool,
    batches: BatchLane,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn MetricSource>, items: SendWorkerPool, batches: BatchLane) -> Self {
        Self {
            source,
            items,
            batches,
        }
    }

    /// 틱 1회: 스냅샷 → 단건 레인 분배 → 배치 레인 전송 대기
    pub async fn tick(&self) -> TickOutcome {
        let batch = self.source.snapshot_for_dispatch();
        if batch.is_empty() {
            debug!("전송할 메트릭 없음");
            return TickOutcome::default();
        }

        let batch_size = batch.len();
        let offered = self.items.offer_batch(&batch);

        let lane = self.batches.clone();
        let batch_delivered = match tokio::spawn(async move { lane.deliver(batch).await }).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("배치 전송 태스크 비정상 종료: {e}");
                false
            }
        };

        debug!(
            "디스패치 완료: {batch_size}개 (큐 {}, 드롭 {})",
            offered.accepted, offered.dropped
        );

        TickOutcome {
            batch_size,
            offered,
            batch_delivered,
        }
    }

    /// 종료 신호까지 주기적으로 틱 실행. 첫 틱은 한 주기 뒤.
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        info!("디스패처 시작: 전송 주기 {period:?}");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    info!("디스패처 종료");
                    break;
                }
            }
        }
        self.items.shutdown().await;
    }
}
