//! 할당 추적 글로벌 할당자.
//!
//! 바이너리에서 `#[global_allocator]`로 설치하면 프로세스 전체의
//! 할당 횟수와 바이트 수가 전역 카운터에 누적된다.
//! 설치하지 않으면 [`stats`]는 모두 0을 반환한다.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static TOTAL_BYTES: AtomicU64 = AtomicU64::new(0);
static MALLOCS: AtomicU64 = AtomicU64::new(0);
static FREES: AtomicU64 = AtomicU64::new(0);

/// 시스템 할당자를 감싸 통계를 세는 할당자
///
/// ```ignore
/// #[global_allocator]
/// static ALLOCATOR: TrackingAllocator = TrackingAllocator::new();
/// ```
pub struct TrackingAllocator {
    inner: System,
}

impl TrackingAllocator {
    pub const fn new() -> Self {
        Self { inner: System }
    }
}

impl Default for TrackingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn record_alloc(size: usize) {
    let size = size as u64;
    LIVE_BYTES.fetch_add(size, Ordering::Relaxed);
    TOTAL_BYTES.fetch_add(size, Ordering::Relaxed);
    MALLOCS.fetch_add(1, Ordering::Relaxed);
}

fn record_free(size: usize) {
    LIVE_BYTES.fetch_sub(size as u64, Ordering::Relaxed);
    FREES.fetch_add(1, Ordering::Relaxed);
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        record_free(layout.size());
    }

    // realloc은 해제 1회 + 할당 1회로 센다
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            record_free(layout.size());
            record_alloc(new_size);
        }
        new_ptr
    }
}

/// 할당 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// 현재 살아 있는 힙 바이트
    pub alloc: u64,
    /// 누적 할당 바이트
    pub total_alloc: u64,
    /// 누적 할당 횟수
    pub mallocs: u64,
    /// 누적 해제 횟수
    pub frees: u64,
}

impl AllocStats {
    /// 살아 있는 힙 객체 수
    pub fn heap_objects(&self) -> u64 {
        self.mallocs.saturating_sub(self.frees)
    }
}

/// 현재 할당 통계
pub fn stats() -> AllocStats {
    AllocStats {
        alloc: LIVE_BYTES.load(Ordering::Relaxed),
        total_alloc: TOTAL_BYTES.load(Ordering::Relaxed),
        mallocs: MALLOCS.load(Ordering::Relaxed),
        frees: FREES.load(Ordering::Relaxed),
    }
}
