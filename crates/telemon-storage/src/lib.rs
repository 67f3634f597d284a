//! # telemon-storage
//!
//! 서버 측 메트릭 저장소 어댑터.
//! 세 백엔드 모두 `MetricStore` 포트를 구현하며 같은 병합 의미를 갖는다.
//!
//! ## 모듈
//! - `memory`: 프로세스 메모리 저장소
//! - `file`: 메모리 저장소 + JSON 스냅샷 파일
//! - `sqlite`: SQLite 저장소 (원자적 upsert)
//! - `migration`: SQLite 스키마 마이그레이션
//! - `persistence`: 복원/주기 저장/종료 시 저장 스케줄러
//! - `factory`: 설정으로 백엔드 선택

pub mod factory;
pub mod file;
pub mod memory;
pub mod migration;
pub mod persistence;
pub mod sqlite;
