//! 에이전트/서버 설정 구조체.
//!
//! 바이너리 crate가 CLI 플래그와 환경 변수로 채운다.
//! 모든 필드는 serde 기본값을 가지므로 부분 설정도 역직렬화된다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::ports::store::StorageBackend;

/// 에이전트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 서버 주소 (`host:port` 또는 `http://host:port`)
    #[serde(default = "default_server_address")]
    pub server_address: String,
    /// 런타임/호스트 샘플링 주기 (초)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 전송 주기 (초)
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    /// 동시 전송 워커 수
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    /// 전송 큐 용량 (워커 수와 무관)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// HMAC 서명 키 (비어 있으면 서명하지 않음)
    #[serde(default)]
    pub signing_key: Option<String>,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            poll_interval_secs: default_poll_interval_secs(),
            report_interval_secs: default_report_interval_secs(),
            rate_limit: default_rate_limit(),
            queue_capacity: default_queue_capacity(),
            signing_key: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl AgentConfig {
    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server_address.trim().is_empty() {
            return Err(CoreError::Config("서버 주소가 비어 있음".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(CoreError::Config("poll 주기는 1초 이상이어야 함".to_string()));
        }
        if self.report_interval_secs == 0 {
            return Err(CoreError::Config(
                "report 주기는 1초 이상이어야 함".to_string(),
            ));
        }
        if self.rate_limit == 0 {
            return Err(CoreError::Config("워커 수는 1 이상이어야 함".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::Config("큐 용량은 1 이상이어야 함".to_string()));
        }
        Ok(())
    }

    /// 스킴이 붙은 서버 기본 URL
    pub fn base_url(&self) -> String {
        let address = self.server_address.trim().trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{address}")
        }
    }

    /// 비어 있지 않은 서명 키
    pub fn signing_key(&self) -> Option<&str> {
        non_empty(self.signing_key.as_deref())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 리슨 주소 (`:8080` 형태 허용)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// 영속화 주기 (초). 0이면 변경 직후 동기 저장
    #[serde(default = "default_store_interval_secs")]
    pub store_interval_secs: u64,
    /// 파일 저장소 경로
    #[serde(default = "default_file_storage_path")]
    pub file_storage_path: Option<PathBuf>,
    /// 시작 시 복원 여부
    #[serde(default = "default_true")]
    pub restore: bool,
    /// 데이터베이스 DSN (SQLite 파일 경로)
    #[serde(default)]
    pub database_dsn: Option<String>,
    /// HMAC 서명 키 (비어 있으면 검증하지 않음)
    #[serde(default)]
    pub signing_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            store_interval_secs: default_store_interval_secs(),
            file_storage_path: default_file_storage_path(),
            restore: true,
            database_dsn: None,
            signing_key: None,
        }
    }
}

impl ServerConfig {
    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.listen_address.trim().is_empty() {
            return Err(CoreError::Config("리슨 주소가 비어 있음".to_string()));
        }
        Ok(())
    }

    /// 백엔드 선택: DSN이 있으면 DB, 파일 경로가 있으면 파일, 아니면 메모리
    pub fn storage_backend(&self) -> StorageBackend {
        if self.database_dsn().is_some() {
            StorageBackend::Database
        } else if self.file_path().is_some() {
            StorageBackend::File
        } else {
            StorageBackend::Memory
        }
    }

    pub fn database_dsn(&self) -> Option<&str> {
        non_empty(self.database_dsn.as_deref())
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        self.file_storage_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn signing_key(&self) -> Option<&str> {
        non_empty(self.signing_key.as_deref())
    }

    pub fn store_interval(&self) -> Duration {
        Duration::from_secs(self.store_interval_secs)
    }

    /// 바인딩 가능한 소켓 주소 문자열 (`:8080` → `0.0.0.0:8080`)
    pub fn bind_address(&self) -> String {
        let address = self.listen_address.trim();
        if address.starts_with(':') {
            format!("0.0.0.0{address}")
        } else {
            address.to_string()
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}
fn default_server_address() -> String {
    "localhost:8080".to_string()
}
fn default_poll_interval_secs() -> u64 {
    2
}
fn default_report_interval_secs() -> u64 {
    10
}
fn default_rate_limit() -> usize {
    1
}
fn default_queue_capacity() -> usize {
    100
}
fn default_request_timeout_ms() -> u64 {
    5_000
}
fn default_listen_address() -> String {
    ":8080".to_string()
}
fn default_store_interval_secs() -> u64 {
    300
}
fn default_file_storage_path() -> Option<PathBuf> {
    Some(PathBuf::from("/tmp/metrics-db.json"))
}
