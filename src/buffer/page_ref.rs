//! RAII handle for pooled pages.
//!
//! A [`PageRef`] is the only way to reach a page inside the pool. Creating
//! one bumps the page's use count; dropping it lowers the count again. The
//! page stays pooled until [`PagePool::evict`](super::PagePool::evict)
//! removes it.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::page_pool::PagePool;
use super::pooled_page::{PoolKey, PooledPage};
use crate::storage::page::Page;

static NULL_PAGE: RwLock<Page> = parking_lot::const_rwlock(Page::NULL);

/// Scoped reference to a pooled page.
///
/// A lookup miss yields a *null* reference whose [`get`](PageRef::get)
/// returns the null page.
///
/// # Example
/// ```
/// use columnardb::buffer::{PagePool, PoolKey};
/// use columnardb::storage::page::{ClusterInfo, ElementType, HeapPageAllocator, PageAllocator};
///
/// let pool = PagePool::new();
/// let key = PoolKey::new(1, ElementType::Raw);
///
/// let mut page = HeapPageAllocator::new().new_page(1, 10);
/// page.grow_unchecked(10);
/// page.set_window(50, ClusterInfo::new(2, 40)).unwrap();
/// drop(pool.register_page(page, key));
///
/// let page_ref = pool.get_page(key, 55);
/// assert_eq!(page_ref.get().global_range_first(), 50);
/// assert!(pool.get_page(key, 65).is_null());
/// ```
pub struct PageRef<'a> {
    /// Reference back to the pool for release on drop.
    pool: &'a PagePool,
    /// The referenced page, `None` for the null reference.
    slot: Option<Arc<PooledPage>>,
}

impl<'a> PageRef<'a> {
    /// Wrap a slot whose use count was already incremented.
    pub(crate) fn new(pool: &'a PagePool, slot: Arc<PooledPage>) -> Self {
        Self {
            pool,
            slot: Some(slot),
        }
    }

    pub(crate) fn null(pool: &'a PagePool) -> Self {
        Self { pool, slot: None }
    }

    /// Check if the lookup that produced this reference missed.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.slot.is_none()
    }

    /// Key of the referenced page.
    pub fn key(&self) -> Option<PoolKey> {
        self.slot.as_ref().map(|slot| slot.key())
    }

    /// Shared access to the page. Returns the null page for a null reference.
    pub fn get(&self) -> RwLockReadGuard<'_, Page> {
        match &self.slot {
            Some(slot) => slot.page(),
            None => NULL_PAGE.read(),
        }
    }

    /// Exclusive access to the page.
    ///
    /// The row window used for pool lookups was captured at registration and
    /// is not affected by changes made here.
    pub fn get_mut(&self) -> Option<RwLockWriteGuard<'_, Page>> {
        self.slot.as_ref().map(|slot| slot.page_mut())
    }

    /// Release the reference before the end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PageRef<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.release_page(&slot);
        }
    }
}

impl std::fmt::Debug for PageRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRef")
            .field("key", &self.key())
            .field("use_count", &self.slot.as_ref().map(|s| s.use_count()))
            .finish()
    }
}
