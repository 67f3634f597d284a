//! 메트릭 저장소 포트.
//!
//! 구현: `telemon-storage` crate (메모리, 파일, SQLite)

use async_trait::async_trait;
use std::fmt;

use crate::error::CoreError;
use crate::models::metric::MetricBatch;
use crate::models::snapshot::StorageSnapshot;

/// 저장소 백엔드 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// 프로세스 메모리 (휘발성)
    Memory,
    /// JSON 스냅샷 파일
    File,
    /// 데이터베이스 (SQLite)
    Database,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
            StorageBackend::Database => "database",
        };
        f.write_str(name)
    }
}

/// 메트릭 저장소.
///
/// 백엔드와 무관하게 동일한 의미를 보장한다.
/// - gauge: 마지막 쓰기 우선
/// - counter: 키별 원자적 합산 (순서 무관)
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// 백엔드 종류
    fn backend(&self) -> StorageBackend;

    /// gauge 값 조회
    async fn get_gauge(&self, id: &str) -> Result<Option<f64>, CoreError>;

    /// gauge 값 설정 (덮어쓰기)
    async fn set_gauge(&self, id: &str, value: f64) -> Result<(), CoreError>;

    /// counter 합계 조회
    async fn get_counter(&self, id: &str) -> Result<Option<i64>, CoreError>;

    /// counter에 delta 누적, 새 합계 반환
    async fn accumulate_counter(&self, id: &str, delta: i64) -> Result<i64, CoreError>;

    /// 모든 메트릭의 시점 스냅샷
    async fn list_all(&self) -> Result<StorageSnapshot, CoreError>;

    /// 배치 병합. counter는 이름별 사전 합산 후 누적, gauge는 마지막 값.
    async fn merge_batch(&self, batch: &MetricBatch) -> Result<(), CoreError>;

    /// 전체 상태를 JSON 스냅샷으로 직렬화
    async fn snapshot(&self) -> Result<Vec<u8>, CoreError> {
        let snapshot = self.list_all().await?;
        Ok(serde_json::to_vec(&snapshot)?)
    }

    /// 스냅샷으로 전체 상태 교체
    async fn restore(&self, data: &[u8]) -> Result<(), CoreError>;

    /// 내구 저장소에 기록 (백엔드에 따라 no-op)
    async fn persist(&self) -> Result<(), CoreError>;

    /// 내구 저장소에서 상태 복원 (백엔드에 따라 no-op)
    async fn load(&self) -> Result<(), CoreError>;

    /// 저장소 연결 확인
    async fn ping(&self) -> Result<(), CoreError>;
}
