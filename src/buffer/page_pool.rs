//! Page Pool - the cache of decoded column pages.
//!
//! The [`PagePool`] provides:
//! - Registration of freshly decoded pages (in use) and preloaded pages (idle)
//! - Lookup by global row index or by cluster-local row index
//! - Use-counted access through [`PageRef`]
//! - Explicit, oldest-first eviction of idle pages

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::page_ref::PageRef;
use super::pooled_page::{PoolKey, PooledPage};
use super::stats::PagePoolStats;
use crate::common::ClusterIndex;
use crate::storage::page::{Page, PageAllocator};

/// Cache of decoded pages keyed by column, element type and row window.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │                        PagePool                          │
/// │  entries: Mutex<Vec<Arc<PooledPage>>>  (oldest first)    │
/// │  ┌────────────┐ ┌────────────┐ ┌────────────┐            │
/// │  │ key        │ │ key        │ │ key        │   ...      │
/// │  │ window     │ │ window     │ │ window     │            │
/// │  │ use_count  │ │ use_count  │ │ use_count  │            │
/// │  │ RwLock<Pg> │ │ RwLock<Pg> │ │ RwLock<Pg> │            │
/// │  └────────────┘ └────────────┘ └────────────┘            │
/// │  allocator: Option<Arc<dyn PageAllocator>>  stats        │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `entries`: `Mutex` — registration, lookup and eviction are serialized
/// - use counts: atomics — releasing a reference never takes the table lock
/// - page data: one `RwLock` per page
///
/// The pool is `Send + Sync` and can be shared between column readers.
///
/// # Lifetime of a page
/// Releasing the last [`PageRef`] keeps the page cached. Only
/// [`evict`](PagePool::evict) removes pages, and only pages with a use count
/// of zero.
pub struct PagePool {
    /// Pooled pages in insertion order.
    entries: Mutex<Vec<Arc<PooledPage>>>,

    /// Receives the buffers of evicted pages, if set.
    allocator: Option<Arc<dyn PageAllocator>>,

    /// Performance statistics.
    stats: PagePoolStats,
}

impl PagePool {
    /// Create an empty pool. Evicted pages are simply dropped.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            allocator: None,
            stats: PagePoolStats::new(),
        }
    }

    /// Create an empty pool that hands evicted pages back to `allocator`.
    pub fn with_allocator(allocator: Arc<dyn PageAllocator>) -> Self {
        Self {
            allocator: Some(allocator),
            ..Self::new()
        }
    }

    // ========================================================================
    // Public API: Add pages
    // ========================================================================

    /// Move a page into the pool and return a reference to it.
    ///
    /// The page starts with a use count of 1. Its window must already be set.
    pub fn register_page(&self, page: Page, key: PoolKey) -> PageRef<'_> {
        let slot = Arc::new(PooledPage::new(page, key, 1));
        self.entries.lock().push(Arc::clone(&slot));
        self.stats.record_registered();

        debug!(column = %key.column_id, element = %key.element_type, "registered page");
        PageRef::new(self, slot)
    }

    /// Move a page into the pool without using it.
    ///
    /// The page starts with a use count of 0 and may be evicted before anyone
    /// looks it up.
    pub fn preload_page(&self, page: Page, key: PoolKey) {
        let slot = Arc::new(PooledPage::new(page, key, 0));
        self.entries.lock().push(slot);
        self.stats.record_preloaded();

        debug!(column = %key.column_id, element = %key.element_type, "preloaded page");
    }

    // ========================================================================
    // Public API: Lookup
    // ========================================================================

    /// Find the page of `key` holding the row with the given global index.
    ///
    /// Returns a null reference if no pooled page matches.
    pub fn get_page(&self, key: PoolKey, global_index: u64) -> PageRef<'_> {
        self.lookup(|slot| slot.matches_global(&key, global_index))
    }

    /// Find the page of `key` holding the given cluster-local row.
    ///
    /// Returns a null reference if no pooled page matches.
    pub fn get_page_in_cluster(&self, key: PoolKey, index: ClusterIndex) -> PageRef<'_> {
        self.lookup(|slot| slot.matches_cluster(&key, index))
    }

    fn lookup(&self, mut matches: impl FnMut(&PooledPage) -> bool) -> PageRef<'_> {
        let entries = self.entries.lock();
        match entries.iter().find(|slot| matches(slot)) {
            Some(slot) => {
                // Pin under the table lock so eviction cannot race the hit.
                slot.acquire();
                self.stats.record_lookup(true);
                PageRef::new(self, Arc::clone(slot))
            }
            None => {
                self.stats.record_lookup(false);
                PageRef::null(self)
            }
        }
    }

    // ========================================================================
    // Public API: Eviction
    // ========================================================================

    /// Remove up to `max_count` idle pages, oldest first.
    ///
    /// Pages with outstanding references are never evicted: callers may hold
    /// views into their memory. Returns the number of pages removed.
    pub fn evict(&self, max_count: usize) -> usize {
        let evicted: Vec<Arc<PooledPage>> = {
            let mut entries = self.entries.lock();
            let mut evicted = Vec::new();
            entries.retain(|slot| {
                if evicted.len() < max_count && slot.is_evictable() {
                    evicted.push(Arc::clone(slot));
                    false
                } else {
                    true
                }
            });
            evicted
        };

        let count = evicted.len();
        self.stats.record_evicted(count);

        if let Some(allocator) = &self.allocator {
            for slot in evicted {
                // A reference that is still dropping may hold the last Arc;
                // its buffer is then freed by that drop instead.
                if let Ok(slot) = Arc::try_unwrap(slot) {
                    allocator.delete_page(slot.into_page());
                }
            }
        }

        if count > 0 {
            debug!(count, requested = max_count, "evicted pages");
        }
        count
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get pool statistics.
    pub fn stats(&self) -> &PagePoolStats {
        &self.stats
    }

    /// Number of pooled pages.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the pool holds no pages.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Use count of the page of `key` holding `global_index`, without
    /// acquiring it. `None` if no such page is pooled.
    pub fn use_count(&self, key: PoolKey, global_index: u64) -> Option<u32> {
        self.entries
            .lock()
            .iter()
            .find(|slot| slot.matches_global(&key, global_index))
            .map(|slot| slot.use_count())
    }

    // ========================================================================
    // Internal: Called by PageRef on drop
    // ========================================================================

    /// Lower the use count of a page. The page stays pooled.
    pub(crate) fn release_page(&self, slot: &PooledPage) {
        slot.release();
    }
}

impl Default for PagePool {
    fn default() -> Self {
        Self::new()
    }
}
