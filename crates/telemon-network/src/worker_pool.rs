//! 단건 전송 워커 풀.
//!
//! 고정 개수의 워커가 하나의 유한 큐를 공유한다. 큐 용량은 워커 수와
//! 무관하며, 가득 찬 큐에 넣으려는 메트릭은 기다리지 않고 버린다.
//! 워커는 결과를 직접 로깅하지 않고 리포트 채널로 보낸다.

use std::sync::Arc;
use telemon_core::models::metric::{Metric, MetricBatch};
use telemon_core::ports::sender::MetricSender;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::report::{DeliveryReport, Lane, ReportSender};

/// 한 번의 분배 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferOutcome {
    pub accepted: usize,
    pub dropped: usize,
}

/// 고정 크기 워커 풀 + 유한 큐
pub struct SendWorkerPool {
    tx: mpsc::Sender<Metric>,
    workers: Vec<JoinHandle<()>>,
    reports: ReportSender,
    capacity: usize,
}

impl SendWorkerPool {
    /// 워커 시작. 현재 tokio 런타임에서 spawn된다.
    pub fn start(
        workers: usize,
        capacity: usize,
        sender: Arc<dyn MetricSender>,
        reports: ReportSender,
    ) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel::<Metric>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let rx = rx.clone();
                let sender = sender.clone();
                let reports = reports.clone();
                tokio::spawn(async move {
                    run_worker(worker_id, rx, sender, reports).await;
                })
            })
            .collect();

        debug!("전송 워커 풀 시작: 워커 {}개, 큐 용량 {capacity}", workers.max(1));

        Self {
            tx,
            workers: handles,
            reports,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// 큐에 넣기. 가득 찼거나 닫혔으면 드롭 리포트를 남기고 `false`.
    pub fn offer(&self, metric: Metric) -> bool {
        match self.tx.try_send(metric) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(metric))
            | Err(mpsc::error::TrySendError::Closed(metric)) => {
                let _ = self.reports.send(DeliveryReport::Dropped { id: metric.id });
                false
            }
        }
    }

    /// 배치의 모든 항목을 큐에 넣는다. 호출자는 절대 블록되지 않는다.
    pub fn offer_batch(&self, batch: &MetricBatch) -> OfferOutcome {
        let mut outcome = OfferOutcome::default();
        for metric in batch.iter() {
            if self.offer(metric.clone()) {
                outcome.accepted += 1;
            } else {
                outcome.dropped += 1;
            }
        }
        outcome
    }

    /// 큐를 닫고 남은 작업을 처리한 뒤 워커 종료를 기다린다.
    pub async fn shutdown(self) {
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.await;
        }
    }
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Metric>>>,
    sender: Arc<dyn MetricSender>,
    reports: ReportSender,
) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(metric) = next else {
            break;
        };

        let report = match sender.send_metric(&metric).await {
            Ok(echoed) => DeliveryReport::Delivered { echoed },
            Err(error) => DeliveryReport::Failed {
                lane: Lane::Item,
                target: metric.id,
                error,
            },
        };
        // 리포트 소비자가 먼저 종료된 경우는 무시
        let _ = reports.send(report);
    }
    debug!("전송 워커 {worker_id} 종료");
}
