//! SQLite 저장소 어댑터.
//!
//! `MetricStore` 포트 구현. DB가 유일한 원본이며 메모리 캐시를 두지 않는다.
//! 모든 연산은 코어 재시도 정책으로 감싸고, `SQLITE_BUSY`/`SQLITE_LOCKED`만
//! 재시도한다.
//!
//! # 모듈 구조
//! - `metrics`: `MetricStore` 포트 구현과 다중 행 upsert

mod metrics;

use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use telemon_core::error::CoreError;
use telemon_core::retry::{retry, RetryPolicy};
use tracing::info;

use crate::migration;

/// 드라이버가 잠금 해제를 기다리는 시간
const BUSY_TIMEOUT: Duration = Duration::from_millis(500);

/// SQLite 저장소 - `MetricStore` 포트 구현
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    retry_policy: RetryPolicy,
}

impl SqliteStorage {
    /// DSN으로 저장소 열기. `:memory:`는 인메모리 DB, 그 외는 파일 경로
    /// (`sqlite://` 접두사 허용).
    pub fn open_dsn(dsn: &str) -> Result<Self, CoreError> {
        let dsn = dsn.trim();
        if dsn == ":memory:" {
            return Self::open_in_memory();
        }
        let path = dsn.strip_prefix("sqlite://").unwrap_or(dsn);
        Self::open(Path::new(path))
    }

    /// 파일 기반 SQLite 저장소 생성
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        let storage = Self::init(conn)?;
        info!("SQLite 저장소 초기화: {}", path.display());
        Ok(storage)
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, CoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| CoreError::Storage(format!("busy_timeout 설정 실패: {e}")))?;
        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            retry_policy: RetryPolicy::default(),
        })
    }

    /// 재시도 정책 교체
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// 연결 잠금 후 작업 1회 실행
    fn with_conn<T, F>(&self, context: &str, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;
        f(&mut conn).map_err(|e| map_sql_error(e, context))
    }

    /// 재시도 정책을 적용해 작업 실행
    async fn run<T, F>(&self, context: &str, f: F) -> Result<T, CoreError>
    where
        T: Send,
        F: Fn(&mut Connection) -> Result<T, rusqlite::Error> + Send + Sync,
    {
        retry(&self.retry_policy, CoreError::is_transient_storage, || async {
            self.with_conn(context, &f)
        })
        .await
    }
}

/// 드라이버 에러 분류: 잠금 경합만 재시도 가능
fn map_sql_error(error: rusqlite::Error, context: &str) -> CoreError {
    match &error {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            CoreError::StorageBusy(format!("{context}: {error}"))
        }
        _ => CoreError::Storage(format!("{context}: {error}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use telemon_core::ports::store::MetricStore;

    /// 별도 연결로 쓰기 잠금을 `hold`만큼 잡는다. 잠금을 얻은 뒤 반환한다.
    fn hold_write_lock(path: &Path, hold: Duration) -> thread::JoinHandle<()> {
        let path = path.to_path_buf();
        let (locked_tx, locked_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("BEGIN IMMEDIATE").unwrap();
            locked_tx.send(()).unwrap();
            thread::sleep(hold);
            conn.execute_batch("COMMIT").unwrap();
        });
        locked_rx.recv().unwrap();
        handle
    }

    #[test]
    fn busy_errors_are_transient() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(
            map_sql_error(busy, "test"),
            CoreError::StorageBusy(_)
        ));

        let locked = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(map_sql_error(locked, "test").is_transient_storage());
    }

    #[test]
    fn other_errors_are_fatal() {
        let err = map_sql_error(rusqlite::Error::QueryReturnedNoRows, "test");
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[test]
    fn dsn_variants() {
        assert!(SqliteStorage::open_dsn(":memory:").is_ok());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metrics.db");
        let dsn = format!("sqlite://{}", path.display());
        assert!(SqliteStorage::open_dsn(&dsn).is_ok());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn busy_database_is_retried_until_lock_released() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metrics.db");
        let store = SqliteStorage::open(&path)
            .unwrap()
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(100)));

        // 첫 시도는 busy_timeout(500ms) 후 실패, 두 번째 시도 중 잠금 해제
        let holder = hold_write_lock(&path, Duration::from_millis(800));
        let total = store.accumulate_counter("PollCount", 5).await.unwrap();
        holder.join().unwrap();

        assert_eq!(total, 5);
        assert_eq!(store.get_counter("PollCount").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn busy_database_without_retry_is_surfaced() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("metrics.db");
        let store = SqliteStorage::open(&path)
            .unwrap()
            .with_retry_policy(RetryPolicy::new(1, Duration::ZERO));

        let holder = hold_write_lock(&path, Duration::from_millis(800));
        let result = store.accumulate_counter("PollCount", 5).await;
        holder.join().unwrap();

        assert!(matches!(result, Err(CoreError::StorageBusy(_))), "{result:?}");
        assert_eq!(store.get_counter("PollCount").await.unwrap(), None);
    }
}
