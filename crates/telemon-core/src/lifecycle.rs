//! 에이전트/서버 공용 종료 처리.
//!
//! OS 시그널 한 번을 `watch` 채널로 샘플러, 디스패처, 전송 워커,
//! HTTP 서버, 영속화 작업에 전파한다. 각 작업은 [`shutdown_requested`]나
//! `changed()`로 신호를 기다린다.

use tokio::sync::watch;
use tracing::info;

/// 종료 신호 송신측. 바이너리의 `main`이 하나만 소유한다.
pub struct LifecycleManager {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// 백그라운드 작업에 넘길 수신기
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// 모든 수신기에 종료 전파. 여러 번 호출해도 된다.
    pub fn shutdown(&self) {
        // 관리자 자신이 가진 수신기 하나는 제외
        let tasks = self.shutdown_tx.receiver_count().saturating_sub(1);
        info!("종료 신호 전파: 작업 {tasks}개");
        self.shutdown_tx.send_replace(true);
    }

    /// SIGINT/SIGTERM (비 unix는 Ctrl+C) 대기 후 종료 전파.
    /// 핸들러 등록 실패는 호출부로 돌려준다.
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;

            tokio::select! {
                _ = sigint.recv() => info!("SIGINT 수신"),
                _ = sigterm.recv() => info!("SIGTERM 수신"),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            info!("Ctrl+C 수신");
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 종료 신호가 이미 왔거나 올 때까지 대기. 송신측이 사라져도 반환한다.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // wait_for는 현재 값도 검사한다
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_running() {
        let lm = LifecycleManager::new();
        assert!(!*lm.subscribe().borrow());
    }

    #[test]
    fn shutdown_reaches_every_subscriber() {
        let lm = LifecycleManager::new();
        let sampler = lm.subscribe();
        let server = lm.subscribe();
        lm.shutdown();
        lm.shutdown();
        assert!(*sampler.borrow());
        assert!(*server.borrow());
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_shutdown() {
        let lm = LifecycleManager::new();
        lm.shutdown();
        let mut rx = lm.subscribe();
        tokio::time::timeout(Duration::from_secs(1), shutdown_requested(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dropped_manager_releases_waiters() {
        let lm = LifecycleManager::new();
        let mut rx = lm.subscribe();
        drop(lm);
        tokio::time::timeout(Duration::from_secs(1), shutdown_requested(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waits_until_shutdown() {
        let lm = LifecycleManager::new();
        let mut rx = lm.subscribe();
        let pending =
            tokio::time::timeout(Duration::from_millis(50), shutdown_requested(&mut rx)).await;
        assert!(pending.is_err());

        lm.shutdown();
        shutdown_requested(&mut rx).await;
    }
}
