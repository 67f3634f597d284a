//! 호스트 메트릭 샘플러.
//!
//! 전체/여유 메모리와 코어별 CPU 사용률. 실패는 호출자에게 반환되며
//! 에이전트는 이를 리포트 채널로 흘려보낼 뿐 종료하지 않는다.

use std::sync::Mutex;
use sysinfo::System;
use telemon_core::error::CoreError;
use tracing::debug;

/// 호스트 통계 스냅샷
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostStats {
    /// 전체 메모리 (바이트)
    pub total_memory: u64,
    /// 여유 메모리 (바이트)
    pub free_memory: u64,
    /// 코어별 CPU 사용률 (0.0 ~ 100.0)
    pub cpu_utilization: Vec<f64>,
}

impl HostStats {
    /// 캐시에 기록할 gauge 목록. 코어 인덱스는 0부터.
    pub fn gauges(&self) -> Vec<(String, f64)> {
        let mut gauges = vec![
            ("TotalMemory".to_string(), self.total_memory as f64),
            ("FreeMemory".to_string(), self.free_memory as f64),
        ];
        gauges.extend(
            self.cpu_utilization
                .iter()
                .enumerate()
                .map(|(i, usage)| (format!("CPUutilization{i}"), *usage)),
        );
        gauges
    }
}

/// sysinfo 기반 호스트 샘플러
///
/// CPU 사용률은 직전 갱신과의 차이로 계산되므로 첫 샘플은 0에 가깝다.
pub struct HostSampler {
    sys: Mutex<System>,
}

impl HostSampler {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_cpu_usage();
        Self {
            sys: Mutex::new(sys),
        }
    }

    /// 호스트 통계 수집
    pub fn sample(&self) -> Result<HostStats, CoreError> {
        let mut sys = self
            .sys
            .lock()
            .map_err(|e| CoreError::Internal(format!("시스템 잠금 실패: {e}")))?;
        sys.refresh_memory();
        sys.refresh_cpu_usage();

        let cpu_utilization: Vec<f64> = sys.cpus().iter().map(|c| c.cpu_usage() as f64).collect();
        if cpu_utilization.is_empty() {
            return Err(CoreError::Internal("CPU 정보를 읽을 수 없음".to_string()));
        }

        let stats = HostStats {
            total_memory: sys.total_memory(),
            free_memory: sys.free_memory(),
            cpu_utilization,
        };

        debug!(
            "호스트 메트릭: 코어 {}개, 여유 메모리 {}/{}MB",
            stats.cpu_utilization.len(),
            stats.free_memory / 1_048_576,
            stats.total_memory / 1_048_576
        );

        Ok(stats)
    }
}

impl Default for HostSampler {
    fn default() -> Self {
        Self::new()
    }
}
