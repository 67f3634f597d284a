//! # telemon-core
//!
//! Telemon 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 에이전트와 서버 양쪽 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 메트릭, 배치, 저장소 스냅샷 (serde Serialize/Deserialize)
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`retry`]: 피보나치 백오프 재시도 유틸리티
//! - [`config`]: 에이전트/서버 설정 구조체
//! - [`lifecycle`]: 종료 신호 전파, OS 시그널 대기

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod ports;
pub mod retry;
