//! PooledPage - a page held by the page pool.
//!
//! A [`PooledPage`] holds a [`Page`] plus the metadata the pool needs:
//! - The key it was registered under
//! - The row window captured at registration
//! - A use count of outstanding [`PageRef`](super::PageRef)s

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{ClusterId, ClusterIndex, ColumnId};
use crate::storage::page::{ElementType, Page};

/// Pool lookup key: column plus in-memory element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub column_id: ColumnId,
    pub element_type: ElementType,
}

impl PoolKey {
    pub fn new(column_id: u64, element_type: ElementType) -> Self {
        Self {
            column_id: ColumnId(column_id),
            element_type,
        }
    }
}

/// Rows a pooled page answers for, fixed when the page enters the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageWindow {
    global_first: u64,
    n_elements: u64,
    cluster_id: ClusterId,
    cluster_first: u64,
}

impl PageWindow {
    fn of(page: &Page) -> Self {
        Self {
            global_first: page.global_range_first(),
            n_elements: page.n_elements() as u64,
            cluster_id: page.cluster_info().id(),
            cluster_first: page.cluster_range_first(),
        }
    }
}

/// A page owned by the pool.
///
/// # Thread Safety
/// - `page`: `RwLock` for read/write synchronization
/// - `use_count`: `AtomicU32` for lock-free reference counting
/// - `key` and the window are immutable
pub struct PooledPage {
    key: PoolKey,
    window: PageWindow,
    page: RwLock<Page>,
    use_count: AtomicU32,
}

impl PooledPage {
    pub(crate) fn new(page: Page, key: PoolKey, use_count: u32) -> Self {
        Self {
            key,
            window: PageWindow::of(&page),
            page: RwLock::new(page),
            use_count: AtomicU32::new(use_count),
        }
    }

    #[inline]
    pub fn key(&self) -> PoolKey {
        self.key
    }

    /// Acquire read lock on the page.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire write lock on the page.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    pub(crate) fn into_page(self) -> Page {
        self.page.into_inner()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub(crate) fn matches_global(&self, key: &PoolKey, global_index: u64) -> bool {
        self.key == *key
            && global_index >= self.window.global_first
            && global_index - self.window.global_first < self.window.n_elements
    }

    pub(crate) fn matches_cluster(&self, key: &PoolKey, index: ClusterIndex) -> bool {
        self.key == *key
            && self.window.cluster_id == index.cluster_id
            && index.index >= self.window.cluster_first
            && index.index - self.window.cluster_first < self.window.n_elements
    }

    // ========================================================================
    // Use count operations (Atomic)
    // ========================================================================

    /// Increment the use count. Returns the new use count.
    #[inline]
    pub(crate) fn acquire(&self) -> u32 {
        self.use_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the use count. Returns the new use count.
    ///
    /// # Panics
    /// Panics if the use count is already 0.
    #[inline]
    pub(crate) fn release(&self) -> u32 {
        let old = self.use_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "page use count underflow");
        old - 1
    }

    #[inline]
    pub fn use_count(&self) -> u32 {
        self.use_count.load(Ordering::Acquire)
    }

    /// Check if the page can be evicted.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        self.use_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{ClusterInfo, HeapPageAllocator, PageAllocator};

    fn pooled(use_count: u32) -> PooledPage {
        let mut page = HeapPageAllocator::new().new_page(1, 10);
        page.grow_unchecked(10);
        page.set_window(50, ClusterInfo::new(2, 40)).unwrap();
        PooledPage::new(page, PoolKey::new(1, ElementType::Raw), use_count)
    }

    #[test]
    fn test_acquire_release() {
        let slot = pooled(0);
        assert!(slot.is_evictable());

        assert_eq!(slot.acquire(), 1);
        assert_eq!(slot.acquire(), 2);
        assert!(!slot.is_evictable());

        assert_eq!(slot.release(), 1);
        assert_eq!(slot.release(), 0);
        assert!(slot.is_evictable());
    }

    #[test]
    #[should_panic(expected = "page use count underflow")]
    fn test_release_underflow() {
        let slot = pooled(0);
        slot.release();
    }

    #[test]
    fn test_window_matching() {
        let slot = pooled(1);
        let key = PoolKey::new(1, ElementType::Raw);

        assert!(slot.matches_global(&key, 50));
        assert!(slot.matches_global(&key, 59));
        assert!(!slot.matches_global(&key, 60));
        assert!(!slot.matches_global(&key, 5));
        assert!(!slot.matches_global(&PoolKey::new(1, ElementType::Int32), 55));

        assert!(slot.matches_cluster(&key, ClusterIndex::new(2, 10)));
        assert!(!slot.matches_cluster(&key, ClusterIndex::new(2, 9)));
        assert!(!slot.matches_cluster(&key, ClusterIndex::new(0, 15)));
    }

    #[test]
    fn test_window_fixed_at_registration() {
        let slot = pooled(1);
        let key = PoolKey::new(1, ElementType::Raw);

        slot.page_mut().set_window(0, ClusterInfo::default()).unwrap();
        assert!(slot.matches_global(&key, 55));
    }

    #[test]
    fn test_concurrent_acquire() {
        use std::sync::Arc;
        use std::thread;

        let slot = Arc::new(pooled(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let slot = Arc::clone(&slot);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    slot.acquire();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(slot.use_count(), 1000);
    }
}
