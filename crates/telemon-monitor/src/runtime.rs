//! 런타임 메트릭 샘플러.
//!
//! 할당자 통계 + sysinfo 기반 프로세스 메모리 + 매 틱 새 난수.

use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use telemon_core::error::CoreError;
use tracing::debug;

use crate::alloc::{self, AllocStats};

/// 런타임 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuntimeStats {
    pub alloc: AllocStats,
    /// 프로세스 상주 메모리 (바이트)
    pub resident_memory: u64,
    /// 프로세스 가상 메모리 (바이트)
    pub virtual_memory: u64,
    /// [0, 1e6) 범위 난수
    pub random_value: f64,
}

impl RuntimeStats {
    /// 캐시에 기록할 gauge 목록
    pub fn gauges(&self) -> Vec<(String, f64)> {
        vec![
            ("Alloc".to_string(), self.alloc.alloc as f64),
            ("TotalAlloc".to_string(), self.alloc.total_alloc as f64),
            ("Mallocs".to_string(), self.alloc.mallocs as f64),
            ("Frees".to_string(), self.alloc.frees as f64),
            ("HeapObjects".to_string(), self.alloc.heap_objects() as f64),
            ("Sys".to_string(), self.resident_memory as f64),
            ("VirtualMemory".to_string(), self.virtual_memory as f64),
            ("RandomValue".to_string(), self.random_value),
        ]
    }
}

/// 현재 프로세스의 런타임 통계 샘플러
pub struct RuntimeSampler {
    sys: Mutex<System>,
    pid: Pid,
}

impl RuntimeSampler {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    /// 런타임 통계 수집
    pub fn sample(&self) -> Result<RuntimeStats, CoreError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| CoreError::Internal(format!("시스템 잠금 실패: {e}")))?;
        sys.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let (resident_memory, virtual_memory) = sys
            .process(self.pid)
            .map(|p| (p.memory(), p.virtual_memory()))
            .ok_or_else(|| CoreError::Internal(format!("프로세스 정보 없음: pid={}", self.pid)))?;

        let stats = RuntimeStats {
            alloc: alloc::stats(),
            resident_memory,
            virtual_memory,
            random_value: rand::random::<f64>() * 1_000_000.0,
        };

        debug!(
            "런타임 메트릭: heap {}KB, 할당 {}회, RSS {}MB",
            stats.alloc.alloc / 1024,
            stats.alloc.mallocs,
            stats.resident_memory / 1_048_576
        );

        Ok(stats)
    }
}

impl Default for RuntimeSampler {
    fn default() -> Self {
        Self::new()
    }
}
