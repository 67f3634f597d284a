//! 영속화 스케줄러.
//!
//! 시작 시 복원, 주기적 저장, 종료 시 마지막 저장을 담당한다.
//! 저장 주기가 0이면 동기 모드로 동작하며 변경 직후 [`PersistenceScheduler::after_mutation`]
//! 호출이 즉시 저장한다.

use std::sync::Arc;
use std::time::Duration;
use telemon_core::error::CoreError;
use telemon_core::lifecycle::shutdown_requested;
use telemon_core::ports::store::MetricStore;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// 영속화 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistPolicy {
    /// 저장 주기. 0이면 변경 직후 저장
    pub interval: Duration,
    /// 시작 시 복원 여부
    pub restore: bool,
}

/// 저장소 영속화 스케줄러
#[derive(Clone)]
pub struct PersistenceScheduler {
    store: Arc<dyn MetricStore>,
    policy: PersistPolicy,
}

impl PersistenceScheduler {
    pub fn new(store: Arc<dyn MetricStore>, policy: PersistPolicy) -> Self {
        Self { store, policy }
    }

    /// 동기 저장 모드 여부
    pub fn is_synchronous(&self) -> bool {
        self.policy.interval.is_zero()
    }

    /// 정책이 켜져 있으면 저장소 복원. 실패하면 빈 상태로 계속한다.
    pub async fn restore_on_start(&self) -> bool {
        if !self.policy.restore {
            debug!("시작 시 복원 비활성화");
            return false;
        }
        match self.store.load().await {
            Ok(()) => {
                info!("{} 저장소 복원 완료", self.store.backend());
                true
            }
            Err(e) => {
                warn!("저장소 복원 실패, 빈 상태로 시작: {e}");
                false
            }
        }
    }

    /// 변경 직후 호출. 동기 모드에서만 저장한다.
    pub async fn after_mutation(&self) -> Result<(), CoreError> {
        if self.is_synchronous() {
            self.store.persist().await?;
        }
        Ok(())
    }

    /// 종료 시 마지막 저장 (최선 노력)
    pub async fn final_flush(&self) {
        match self.store.persist().await {
            Ok(()) => info!("종료 전 저장 완료"),
            Err(e) => error!("종료 전 저장 실패: {e}"),
        }
    }

    /// 종료 신호까지 주기 저장 루프 실행
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.is_synchronous() {
            info!("동기 저장 모드: 변경마다 저장");
            shutdown_requested(&mut shutdown).await;
            return;
        }

        let mut interval = tokio::time::interval(self.policy.interval);
        interval.tick().await;
        info!("주기 저장 시작: {:?}", self.policy.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.store.persist().await {
                        warn!("주기 저장 실패: {e}");
                    }
                }
                _ = shutdown_requested(&mut shutdown) => {
                    debug!("주기 저장 루프 종료");
                    break;
                }
            }
        }
    }
}
