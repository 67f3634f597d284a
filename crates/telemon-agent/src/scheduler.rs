//! 에이전트 스케줄러.
//!
//! 두 샘플러 루프(런타임, 호스트)와 디스패처를 각각의 태스크로 띄운다.
//! 모든 루프는 같은 종료 신호를 구독한다.

use std::sync::Arc;
use std::time::Duration;
use telemon_core::error::CoreError;
use telemon_monitor::cache::MetricCache;
use telemon_monitor::host::HostSampler;
use telemon_monitor::runtime::RuntimeSampler;
use telemon_network::dispatcher::Dispatcher;
use telemon_network::report::{DeliveryReport, ReportSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// 스케줄러 주기 설정
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// 샘플링 주기
    pub poll_interval: Duration,
    /// 전송 주기
    pub report_interval: Duration,
}

/// 에이전트 루프 오케스트레이터
pub struct Scheduler {
    config: SchedulerConfig,
    cache: Arc<MetricCache>,
    runtime: RuntimeSampler,
    host: HostSampler,
    dispatcher: Dispatcher,
    reports: ReportSender,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        cache: Arc<MetricCache>,
        runtime: RuntimeSampler,
        host: HostSampler,
        dispatcher: Dispatcher,
        reports: ReportSender,
    ) -> Self {
        Self {
            config,
            cache,
            runtime,
            host,
            dispatcher,
            reports,
        }
    }

    /// 모든 루프 시작. 반환된 핸들은 종료 신호 후 끝난다.
    pub fn spawn(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        info!(
            "스케줄러 시작: 샘플링 {:?}, 전송 {:?}",
            self.config.poll_interval, self.config.report_interval
        );

        let runtime = self.runtime;
        let runtime_cache = self.cache.clone();
        let runtime_task = spawn_sampler(
            "runtime",
            self.config.poll_interval,
            shutdown_rx.clone(),
            self.reports.clone(),
            move || {
                let stats = runtime.sample()?;
                runtime_cache.record_runtime(stats.gauges());
                Ok(())
            },
        );

        let host = self.host;
        let host_cache = self.cache;
        let host_task = spawn_sampler(
            "host",
            self.config.poll_interval,
            shutdown_rx.clone(),
            self.reports,
            move || {
                let stats = host.sample()?;
                host_cache.record_host(stats.gauges());
                Ok(())
            },
        );

        let dispatcher = self.dispatcher;
        let report_interval = self.config.report_interval;
        let dispatch_task = tokio::spawn(async move {
            dispatcher.run(report_interval, shutdown_rx).await;
        });

        vec![runtime_task, host_task, dispatch_task]
    }
}

/// 주기 샘플링 루프. 실패는 리포트 채널로 보내고 다음 틱에 다시 시도한다.
fn spawn_sampler<F>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    reports: ReportSender,
    mut step: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Result<(), CoreError> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(error) = step() {
                        let _ = reports.send(DeliveryReport::SamplerFailed { sampler: name, error });
                    }
                }
                _ = shutdown.changed() => {
                    debug!("{name} 샘플러 종료");
                    break;
                }
            }
        }
    })
}
