//! # telemon-agent
//!
//! 메트릭 수집 에이전트 바이너리 진입점.
//! 샘플러 → 캐시 → 디스패처 → 전송 워커/배치 레인 배선, 라이프사이클 관리.

mod scheduler;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use telemon_core::config::AgentConfig;
use telemon_core::lifecycle::LifecycleManager;
use telemon_core::ports::sender::MetricSender;
use telemon_monitor::alloc::TrackingAllocator;
use telemon_monitor::cache::MetricCache;
use telemon_monitor::host::HostSampler;
use telemon_monitor::runtime::RuntimeSampler;
use telemon_network::codec::TransportCodec;
use telemon_network::dispatcher::{BatchLane, Dispatcher};
use telemon_network::http_client::HttpMetricSender;
use telemon_network::report::{report_channel, ReportLogger};
use telemon_network::worker_pool::SendWorkerPool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scheduler::{Scheduler, SchedulerConfig};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator::new();

/// 종료 후 진행 중 전송을 기다리는 최대 시간
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Telemon 수집 에이전트
///
/// 런타임/호스트 메트릭을 주기적으로 수집해 서버로 보낸다.
#[derive(Parser, Debug)]
#[command(name = "telemon-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 서버 주소 (host:port)
    #[arg(short = 'a', long, env = "ADDRESS", default_value = "localhost:8080")]
    address: String,

    /// 전송 주기 (초)
    #[arg(short = 'r', long, env = "REPORT_INTERVAL", default_value_t = 10)]
    report_interval: u64,

    /// 샘플링 주기 (초)
    #[arg(short = 'p', long, env = "POLL_INTERVAL", default_value_t = 2)]
    poll_interval: u64,

    /// HMAC 서명 키 (비어 있으면 서명하지 않음)
    #[arg(short = 'k', long, env = "KEY")]
    key: Option<String>,

    /// 동시 전송 워커 수
    #[arg(short = 'l', long, env = "RATE_LIMIT", default_value_t = 1)]
    rate_limit: usize,

    /// 전송 큐 용량
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 100)]
    queue_capacity: usize,

    /// 요청 타임아웃 (밀리초)
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn to_config(&self) -> AgentConfig {
        AgentConfig {
            server_address: self.address.clone(),
            poll_interval_secs: self.poll_interval,
            report_interval_secs: self.report_interval,
            rate_limit: self.rate_limit,
            queue_capacity: self.queue_capacity,
            signing_key: self.key.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "telemon_agent={level},telemon_core={level},telemon_monitor={level},telemon_network={level}",
        level = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let config = args.to_config();
    config.validate()?;

    let codec = TransportCodec::from_key(config.signing_key());
    if codec.enforces_signature() {
        info!("HMAC 서명 활성화");
    }
    let sender: Arc<dyn MetricSender> = Arc::new(HttpMetricSender::new(
        &config.base_url(),
        codec,
        config.request_timeout(),
    )?);

    // 리포트 채널: 모든 전송 결과의 단일 소비자
    let (reports, report_rx) = report_channel();
    let logger = tokio::spawn(ReportLogger::new(report_rx).run());

    let cache = Arc::new(MetricCache::new());
    let pool = SendWorkerPool::start(
        config.rate_limit,
        config.queue_capacity,
        sender.clone(),
        reports.clone(),
    );
    let lane = BatchLane::new(sender, reports.clone());
    let dispatcher = Dispatcher::new(cache.clone(), pool, lane);

    let scheduler = Scheduler::new(
        SchedulerConfig {
            poll_interval: config.poll_interval(),
            report_interval: config.report_interval(),
        },
        cache,
        RuntimeSampler::new(),
        HostSampler::new(),
        dispatcher,
        reports,
    );

    let lifecycle = LifecycleManager::new();
    let handles = scheduler.spawn(lifecycle.subscribe());

    info!(
        "Telemon 에이전트 실행 중 (Ctrl+C로 종료): 서버 {}, 워커 {}개",
        config.base_url(),
        config.rate_limit
    );

    lifecycle.wait_for_signal().await?;

    match tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles)).await {
        Ok(_) => match logger.await {
            Ok(summary) => info!(
                "전송 요약: 단건 {}, 배치 {}, 실패 {}, 드롭 {}, 샘플링 실패 {}",
                summary.delivered,
                summary.batches,
                summary.failed,
                summary.dropped,
                summary.sampler_errors
            ),
            Err(e) => warn!("리포트 로거 종료 실패: {e}"),
        },
        Err(_) => warn!("진행 중 전송을 기다리지 않고 종료"),
    }

    info!("Telemon 에이전트 종료");
    Ok(())
}
