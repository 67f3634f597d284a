//! # telemon-monitor
//!
//! 에이전트 측 메트릭 샘플러.
//! 프로세스 할당 통계와 호스트 CPU/메모리를 주기적으로 읽어
//! [`cache::MetricCache`]에 기록한다. 디스패처는 캐시만 읽는다.

pub mod alloc;
pub mod cache;
pub mod host;
pub mod runtime;
