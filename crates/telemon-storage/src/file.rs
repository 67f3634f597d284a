//! 파일 저장소.
//!
//! 메모리 저장소에 JSON 스냅샷 파일을 더한다. 저장할 때마다 파일을
//! 비우고 전체 스냅샷을 다시 쓴다.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use telemon_core::error::CoreError;
use telemon_core::models::metric::MetricBatch;
use telemon_core::models::snapshot::StorageSnapshot;
use telemon_core::ports::store::{MetricStore, StorageBackend};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::memory::MemStorage;

/// JSON 파일 백엔드 저장소 - `MetricStore` 포트 구현
pub struct FileStorage {
    mem: MemStorage,
    path: PathBuf,
    // 동시 persist가 파일 내용을 섞지 않도록 직렬화
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// 새 파일 저장소 생성. 파일은 persist/load 시점에만 접근한다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            mem: MemStorage::new(),
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MetricStore for FileStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::File
    }

    async fn get_gauge(&self, id: &str) -> Result<Option<f64>, CoreError> {
        Ok(self.mem.gauge(id))
    }

    async fn set_gauge(&self, id: &str, value: f64) -> Result<(), CoreError> {
        self.mem.put_gauge(id, value);
        Ok(())
    }

    async fn get_counter(&self, id: &str) -> Result<Option<i64>, CoreError> {
        Ok(self.mem.counter(id))
    }

    async fn accumulate_counter(&self, id: &str, delta: i64) -> Result<i64, CoreError> {
        self.mem.add_counter(id, delta)
    }

    async fn list_all(&self) -> Result<StorageSnapshot, CoreError> {
        Ok(self.mem.current())
    }

    async fn merge_batch(&self, batch: &MetricBatch) -> Result<(), CoreError> {
        self.mem.merge(batch)
    }

    async fn restore(&self, data: &[u8]) -> Result<(), CoreError> {
        let snapshot: StorageSnapshot = serde_json::from_slice(data)?;
        self.mem.replace(snapshot);
        Ok(())
    }

    async fn persist(&self) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock().await;
        let data = serde_json::to_vec(&self.mem.current())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &data).await?;

        debug!("스냅샷 저장: {} ({} bytes)", self.path.display(), data.len());
        Ok(())
    }

    async fn load(&self) -> Result<(), CoreError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("스냅샷 파일 없음, 빈 상태로 시작: {}", self.path.display());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            info!("스냅샷 파일이 비어 있음: {}", self.path.display());
            return Ok(());
        }

        self.restore(&data).await?;
        let snapshot = self.mem.current();
        info!(
            "스냅샷 복원: gauge {}개, counter {}개",
            snapshot.gauges.len(),
            snapshot.counters.len()
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
