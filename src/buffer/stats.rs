//! Page pool counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a [`PagePool`](super::PagePool).
///
/// Updated by the pool only; read them through [`snapshot`](Self::snapshot).
/// Counters are independent of each other, so relaxed ordering suffices.
#[derive(Debug, Default)]
pub struct PagePoolStats {
    hits: AtomicU64,
    misses: AtomicU64,
    registered: AtomicU64,
    preloaded: AtomicU64,
    evicted: AtomicU64,
}

impl PagePoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_lookup(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_preloaded(&self) {
        self.preloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
            pages_registered: self.registered.load(Ordering::Relaxed),
            pages_preloaded: self.preloaded.load(Ordering::Relaxed),
            evictions: self.evicted.load(Ordering::Relaxed),
        }
    }
}

/// Pool counters at one point in time.
///
/// # Example
/// ```
/// use columnardb::buffer::{PagePool, PoolKey};
/// use columnardb::storage::page::{ClusterInfo, ElementType, HeapPageAllocator, PageAllocator};
///
/// let pool = PagePool::new();
/// let mut page = HeapPageAllocator::new().new_page(4, 8);
/// page.set_window(0, ClusterInfo::default()).unwrap();
/// pool.preload_page(page, PoolKey::new(1, ElementType::Float32));
/// pool.evict(1);
///
/// let stats = pool.stats().snapshot();
/// assert_eq!(stats.pages_pooled(), 1);
/// assert_eq!(stats.resident(), 0);
/// assert_eq!(stats.eviction_rate(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub pages_registered: u64,
    pub pages_preloaded: u64,
    pub evictions: u64,
}

impl StatsSnapshot {
    /// Pages ever added, in use or not.
    pub fn pages_pooled(&self) -> u64 {
        self.pages_registered + self.pages_preloaded
    }

    /// Pages added and not evicted since.
    pub fn resident(&self) -> u64 {
        self.pages_pooled().saturating_sub(self.evictions)
    }

    /// Share of lookups that found a page, 0.0 without lookups.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// Share of pooled pages that were evicted again, 0.0 for an unused pool.
    pub fn eviction_rate(&self) -> f64 {
        ratio(self.evictions, self.pages_pooled())
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PagePool {{ resident: {}, registered: {}, preloaded: {}, evicted: {}, \
             lookups: {}, hit_rate: {:.2}% }}",
            self.resident(),
            self.pages_registered,
            self.pages_preloaded,
            self.evictions,
            self.cache_hits + self.cache_misses,
            self.hit_rate() * 100.0
        )
    }
}
