//! # telemon-server
//!
//! 메트릭 수집 서버 바이너리 진입점.
//! 저장소 백엔드 선택, 시작 시 복원, 주기 저장, HTTP 서버, 종료 시 마지막 저장.

use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use telemon_core::config::ServerConfig;
use telemon_core::lifecycle::LifecycleManager;
use telemon_network::codec::TransportCodec;
use telemon_storage::factory::open_store;
use telemon_storage::persistence::{PersistPolicy, PersistenceScheduler};
use telemon_web::{AppState, WebServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Telemon 수집 서버
///
/// 에이전트가 보낸 메트릭을 저장하고 조회 API를 제공한다.
#[derive(Parser, Debug)]
#[command(name = "telemon-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 리슨 주소 (`:8080` 형태 허용)
    #[arg(short = 'a', long, env = "ADDRESS", default_value = ":8080")]
    address: String,

    /// 저장 주기 (초). 0이면 변경마다 저장
    #[arg(short = 'i', long, env = "STORE_INTERVAL", default_value_t = 300)]
    store_interval: u64,

    /// 파일 저장소 경로 (비우면 메모리 저장소)
    #[arg(short = 'f', long, env = "FILE_STORAGE_PATH", default_value = "/tmp/metrics-db.json")]
    file_storage_path: String,

    /// 시작 시 복원 여부
    #[arg(short = 'r', long, env = "RESTORE", default_value_t = true, action = ArgAction::Set)]
    restore: bool,

    /// 데이터베이스 DSN (SQLite 파일 경로, 지정하면 파일 저장소보다 우선)
    #[arg(short = 'd', long, env = "DATABASE_DSN")]
    database_dsn: Option<String>,

    /// HMAC 서명 키 (비어 있으면 검증하지 않음)
    #[arg(short = 'k', long, env = "KEY")]
    key: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn to_config(&self) -> ServerConfig {
        ServerConfig {
            listen_address: self.address.clone(),
            store_interval_secs: self.store_interval,
            file_storage_path: Some(PathBuf::from(&self.file_storage_path)),
            restore: self.restore,
            database_dsn: self.database_dsn.clone(),
            signing_key: self.key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "telemon_server={level},telemon_core={level},telemon_storage={level},telemon_web={level},tower_http={level}",
        level = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let config = args.to_config();
    config.validate()?;

    // ── 저장소 + 영속화 ──
    let store = open_store(&config)?;
    let persistence = PersistenceScheduler::new(
        store.clone(),
        PersistPolicy {
            interval: config.store_interval(),
            restore: config.restore,
        },
    );
    persistence.restore_on_start().await;

    let lifecycle = LifecycleManager::new();

    let persist_task = {
        let scheduler = persistence.clone();
        let shutdown_rx = lifecycle.subscribe();
        tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
        })
    };

    // ── HTTP 서버 ──
    let codec = TransportCodec::from_key(config.signing_key());
    if codec.enforces_signature() {
        info!("요청 서명 검증 활성화");
    }
    let state = AppState {
        store,
        codec,
        persistence: persistence.clone(),
    };
    let mut server_task = tokio::spawn(
        WebServer::new(config.bind_address(), state).run(lifecycle.subscribe()),
    );

    // 시그널 또는 서버 조기 종료 (바인드 실패 등)
    let early_exit = tokio::select! {
        signal = lifecycle.wait_for_signal() => {
            signal?;
            None
        }
        joined = &mut server_task => Some(joined),
    };
    let served = match early_exit {
        Some(joined) => {
            lifecycle.shutdown();
            joined
        }
        None => server_task.await,
    };

    let _ = persist_task.await;
    persistence.final_flush().await;

    served??;
    info!("Telemon 서버 종료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemon_core::ports::store::StorageBackend;

    #[test]
    fn defaults_select_file_backend() {
        let config = Args::parse_from(["telemon-server"]).to_config();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.storage_backend(), StorageBackend::File);
        assert!(config.restore);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Args::parse_from([
            "telemon-server",
            "-a",
            "127.0.0.1:9090",
            "-i",
            "0",
            "-r",
            "false",
            "-d",
            "/tmp/metrics.db",
            "-k",
            "secret",
        ])
        .to_config();

        assert_eq!(config.store_interval_secs, 0);
        assert!(!config.restore);
        assert_eq!(config.storage_backend(), StorageBackend::Database);
        assert_eq!(config.signing_key(), Some("secret"));
    }

    #[test]
    fn empty_file_path_selects_memory() {
        let config = Args::parse_from(["telemon-server", "-f", ""]).to_config();
        assert_eq!(config.storage_backend(), StorageBackend::Memory);
    }
}
