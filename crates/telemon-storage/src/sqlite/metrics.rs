//! 메트릭 스토리지 (`MetricStore` 포트 구현).
//!
//! counter 누적은 `ON CONFLICT ... SET val = counter.val + excluded.val`로
//! DB가 원자적으로 처리한다. 배치는 종류별 사전 집계 후 한 트랜잭션 안에서
//! 다중 행 upsert로 기록한다. 값은 항상 파라미터로 바인딩한다.
//!
//! SQLite는 정수 덧셈이 넘치면 REAL로 승격시키므로, 갱신 조건으로
//! 합계가 정수일 때만 쓰고 건너뛴 행이 있으면 트랜잭션을 되돌린다.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::collections::BTreeMap;
use telemon_core::error::CoreError;
use telemon_core::models::metric::MetricBatch;
use telemon_core::models::snapshot::{AggregatedBatch, StorageSnapshot};
use telemon_core::ports::store::{MetricStore, StorageBackend};
use tracing::{debug, info};

use super::SqliteStorage;

/// 문장 하나에 넣는 최대 행 수 (바인딩 변수 한도 이내)
const MAX_ROWS_PER_STATEMENT: usize = 400;

/// upsert 대상 테이블
#[derive(Debug, Clone, Copy)]
enum Table {
    Gauge,
    Counter,
}

impl Table {
    fn insert_head(&self) -> &'static str {
        match self {
            Table::Gauge => "INSERT INTO gauge (mname, val) VALUES ",
            Table::Counter => "INSERT INTO counter (mname, val) VALUES ",
        }
    }

    fn conflict_tail(&self) -> &'static str {
        match self {
            Table::Gauge => " ON CONFLICT(mname) DO UPDATE SET val = excluded.val",
            Table::Counter => {
                " ON CONFLICT(mname) DO UPDATE SET val = counter.val + excluded.val \
                 WHERE typeof(counter.val + excluded.val) = 'integer'"
            }
        }
    }
}

/// 다중 행 upsert. 행이 많으면 여러 문장으로 나눈다.
/// 반환값은 실제로 쓴 행 수 (범위를 넘어 건너뛴 counter 제외).
fn upsert_rows<V: ToSql>(
    conn: &Connection,
    table: Table,
    rows: &BTreeMap<String, V>,
) -> Result<usize, rusqlite::Error> {
    let rows: Vec<(&String, &V)> = rows.iter().collect();
    let mut written = 0;

    for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
        let placeholders = (0..chunk.len())
            .map(|i| format!("(?{}, ?{})", 2 * i + 1, 2 * i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "{}{}{}",
            table.insert_head(),
            placeholders,
            table.conflict_tail()
        );

        let bound: Vec<&dyn ToSql> = chunk
            .iter()
            .flat_map(|(name, val)| [*name as &dyn ToSql, *val as &dyn ToSql])
            .collect();
        written += conn.execute(&sql, bound.as_slice())?;
    }

    Ok(written)
}

fn read_all(conn: &Connection) -> Result<StorageSnapshot, rusqlite::Error> {
    let mut snapshot = StorageSnapshot::default();

    let mut stmt = conn.prepare("SELECT mname, val FROM gauge")?;
    let gauges = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
    for gauge in gauges {
        let (name, val) = gauge?;
        snapshot.gauges.insert(name, val);
    }

    let mut stmt = conn.prepare("SELECT mname, val FROM counter")?;
    let counters =
        stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for counter in counters {
        let (name, val) = counter?;
        snapshot.counters.insert(name, val);
    }

    Ok(snapshot)
}

fn counter_overflow(id: &str) -> CoreError {
    CoreError::InvalidMetric(format!("counter 합계 범위 초과: {id}"))
}

#[async_trait]
impl MetricStore for SqliteStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Database
    }

    async fn get_gauge(&self, id: &str) -> Result<Option<f64>, CoreError> {
        self.run("gauge 조회 실패", |conn| {
            conn.query_row("SELECT val FROM gauge WHERE mname = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
    }

    async fn set_gauge(&self, id: &str, value: f64) -> Result<(), CoreError> {
        self.run("gauge 저장 실패", |conn| {
            conn.execute(
                "INSERT INTO gauge (mname, val) VALUES (?1, ?2)
                 ON CONFLICT(mname) DO UPDATE SET val = excluded.val",
                params![id, value],
            )
        })
        .await?;
        Ok(())
    }

    async fn get_counter(&self, id: &str) -> Result<Option<i64>, CoreError> {
        self.run("counter 조회 실패", |conn| {
            conn.query_row("SELECT val FROM counter WHERE mname = ?1", [id], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
    }

    async fn accumulate_counter(&self, id: &str, delta: i64) -> Result<i64, CoreError> {
        // 갱신 조건이 거짓이면 행이 반환되지 않는다
        let total: Option<i64> = self
            .run("counter 누적 실패", |conn| {
                conn.query_row(
                    "INSERT INTO counter (mname, val) VALUES (?1, ?2)
                     ON CONFLICT(mname) DO UPDATE SET val = counter.val + excluded.val
                     WHERE typeof(counter.val + excluded.val) = 'integer'
                     RETURNING val",
                    params![id, delta],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;
        total.ok_or_else(|| counter_overflow(id))
    }

    async fn list_all(&self) -> Result<StorageSnapshot, CoreError> {
        self.run("메트릭 목록 조회 실패", |conn| read_all(conn)).await
    }

    async fn merge_batch(&self, batch: &MetricBatch) -> Result<(), CoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let agg = AggregatedBatch::try_from(batch)?;

        let committed = self
            .run("배치 병합 실패", |conn| {
                let tx = conn.transaction()?;
                upsert_rows(&tx, Table::Gauge, &agg.gauges)?;
                let written = upsert_rows(&tx, Table::Counter, &agg.counters)?;
                if written < agg.counters.len() {
                    // drop 시 롤백
                    return Ok(false);
                }
                tx.commit()?;
                Ok(true)
            })
            .await?;
        if !committed {
            return Err(CoreError::InvalidMetric(
                "counter 합계 범위 초과: 배치 전체 거부".to_string(),
            ));
        }

        debug!(
            "배치 병합: gauge {}개, counter {}개",
            agg.gauges.len(),
            agg.counters.len()
        );
        Ok(())
    }

    async fn restore(&self, data: &[u8]) -> Result<(), CoreError> {
        let snapshot: StorageSnapshot = serde_json::from_slice(data)?;

        self.run("스냅샷 복원 실패", |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM gauge", [])?;
            tx.execute("DELETE FROM counter", [])?;
            upsert_rows(&tx, Table::Gauge, &snapshot.gauges)?;
            upsert_rows(&tx, Table::Counter, &snapshot.counters)?;
            tx.commit()
        })
        .await
    }

    async fn persist(&self) -> Result<(), CoreError> {
        // 모든 쓰기가 이미 커밋되어 있다
        Ok(())
    }

    async fn load(&self) -> Result<(), CoreError> {
        let (gauges, counters): (i64, i64) = self
            .run("메트릭 수 조회 실패", |conn| {
                conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM gauge), (SELECT COUNT(*) FROM counter)",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await?;
        info!("DB 메트릭 확인: gauge {gauges}개, counter {counters}개");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CoreError> {
        self.run("DB 연결 확인 실패", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        })
        .await?;
        Ok(())
    }
}
