//! Page allocators.

use std::sync::atomic::{AtomicU64, Ordering};

use super::page::Page;

/// Creates and destroys page buffers.
///
/// Allocation failure is not reported: like any Rust allocation it aborts the
/// process.
pub trait PageAllocator: Send + Sync {
    /// Allocate a zeroed page for `max_elements` elements of `element_size`
    /// bytes. The page starts empty with a default window.
    fn new_page(&self, element_size: usize, max_elements: usize) -> Page;

    /// Release a page's buffer.
    fn delete_page(&self, page: Page);
}

/// Allocates page buffers on the heap.
#[derive(Debug, Default)]
pub struct HeapPageAllocator {
    allocated: AtomicU64,
    deleted: AtomicU64,
}

impl HeapPageAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages handed out so far.
    pub fn pages_allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Number of pages given back through [`PageAllocator::delete_page`].
    pub fn pages_deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }
}

impl PageAllocator for HeapPageAllocator {
    fn new_page(&self, element_size: usize, max_elements: usize) -> Page {
        let buffer = vec![0u8; element_size * max_elements].into_boxed_slice();
        self.allocated.fetch_add(1, Ordering::Relaxed);
        Page::from_buffer(buffer, element_size, max_elements)
    }

    fn delete_page(&self, page: Page) {
        if page.into_buffer().is_some() {
            self.deleted.fetch_add(1, Ordering::Relaxed);
        }
    }
}
