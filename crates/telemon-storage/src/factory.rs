//! 설정으로 저장소 백엔드 선택.

use std::sync::Arc;
use telemon_core::config::ServerConfig;
use telemon_core::error::CoreError;
use telemon_core::ports::store::{MetricStore, StorageBackend};
use tracing::info;

use crate::file::FileStorage;
use crate::memory::MemStorage;
use crate::sqlite::SqliteStorage;

/// 설정된 백엔드로 저장소를 만든다. 프로세스당 한 번 호출해 주입한다.
pub fn open_store(config: &ServerConfig) -> Result<Arc<dyn MetricStore>, CoreError> {
    let backend = config.storage_backend();
    let store: Arc<dyn MetricStore> = match backend {
        StorageBackend::Database => {
            let dsn = config
                .database_dsn()
                .ok_or_else(|| CoreError::Config("DSN이 비어 있음".to_string()))?;
            Arc::new(SqliteStorage::open_dsn(dsn)?)
        }
        StorageBackend::File => {
            let path = config
                .file_path()
                .ok_or_else(|| CoreError::Config("파일 경로가 비어 있음".to_string()))?;
            Arc::new(FileStorage::new(path.clone()))
        }
        StorageBackend::Memory => Arc::new(MemStorage::new()),
    };

    info!("저장소 백엔드: {backend}");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn selects_backend_from_config() {
        let dir = tempfile::TempDir::new().unwrap();

        let mut config = ServerConfig {
            file_storage_path: None,
            ..ServerConfig::default()
        };
        assert_eq!(open_store(&config).unwrap().backend(), StorageBackend::Memory);

        config.file_storage_path = Some(dir.path().join("m.json"));
        assert_eq!(open_store(&config).unwrap().backend(), StorageBackend::File);

        config.database_dsn = Some(dir.path().join("m.db").display().to_string());
        assert_eq!(open_store(&config).unwrap().backend(), StorageBackend::Database);
    }

    #[test]
    fn unopenable_database_is_a_startup_error() {
        let config = ServerConfig {
            database_dsn: Some("/nonexistent-dir/for/sure/metrics.db".to_string()),
            file_storage_path: Some(PathBuf::from("/tmp/ignored.json")),
            ..ServerConfig::default()
        };
        assert!(matches!(open_store(&config), Err(CoreError::Storage(_))));
    }
}
