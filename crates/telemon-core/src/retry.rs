//! 재시도 유틸리티.
//!
//! 호출부는 "재시도 가능한 에러인가" 판별 함수와 작업 단위만 넘긴다.
//! 네트워크 전송과 DB 연산이 같은 정책을 공유한다.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 기본 최대 시도 횟수 (최초 시도 포함)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// 기본 백오프 시작 간격
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// 재시도 정책 - 피보나치 백오프 + 시도 횟수 상한
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// 새 정책 생성. `max_attempts`가 0이면 1로 취급한다.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 시도 사이 대기 시간 시퀀스
    pub fn backoff(&self) -> FibonacciBackoff {
        FibonacciBackoff::new(self.base_delay)
    }
}

/// base, base, 2·base, 3·base, 5·base, ...
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev: Duration,
    curr: Duration,
}

impl FibonacciBackoff {
    pub fn new(base: Duration) -> Self {
        Self {
            prev: Duration::ZERO,
            curr: base,
        }
    }
}

impl Iterator for FibonacciBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.curr;
        let next = self.prev.saturating_add(self.curr);
        self.prev = self.curr;
        self.curr = next;
        Some(delay)
    }
}

/// 재시도가 포함된 작업 실행
///
/// 재시도 불가 에러는 즉시 반환하고, 시도 횟수를 모두 소진하면
/// 마지막 에러를 반환한다.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut backoff = policy.backoff();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_retryable(&e) || attempt >= policy.max_attempts {
                    return Err(e);
                }

                let delay = backoff.next().unwrap_or(policy.base_delay);
                warn!(
                    "작업 실패 (시도 {attempt}/{}): {e}, {delay:?} 후 재시도",
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
