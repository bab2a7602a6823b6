//! Page - a window of decoded column elements.
//!
//! A [`Page`] owns a contiguous buffer sized for `max_elements` elements of
//! `element_size` bytes each. Besides the data it records which rows it
//! represents: the global index of its first element and the cluster it
//! belongs to.

use crate::common::{ClusterId, ClusterIndex, Error, Result};

/// Cluster identity of a page.
///
/// `index_offset` is the global index of the cluster's first row, so a page
/// starting at global row `g` starts at cluster-local row `g - index_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterInfo {
    id: ClusterId,
    index_offset: u64,
}

impl ClusterInfo {
    pub const fn new(id: u64, index_offset: u64) -> Self {
        Self {
            id: ClusterId(id),
            index_offset,
        }
    }

    #[inline]
    pub fn id(&self) -> ClusterId {
        self.id
    }

    #[inline]
    pub fn index_offset(&self) -> u64 {
        self.index_offset
    }
}

/// A bounded buffer of homogeneous column elements.
///
/// A page without a buffer is the *null page*. The page pool hands it out
/// when a lookup misses.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code; page buffers are
/// moved into the pool, never copied. A `#[cfg(test)]` Clone is provided for
/// tests.
///
/// # Example
/// ```
/// use columnardb::storage::page::{ClusterInfo, HeapPageAllocator, PageAllocator};
///
/// let allocator = HeapPageAllocator::new();
/// let mut page = allocator.new_page(4, 16);
/// page.grow_unchecked(10);
/// page.set_window(100, ClusterInfo::new(1, 90)).unwrap();
///
/// assert_eq!(page.n_bytes(), 40);
/// assert_eq!(page.global_range_last(), 109);
/// assert_eq!(page.cluster_range_first(), 10);
/// ```
#[derive(Debug)]
pub struct Page {
    buffer: Option<Box<[u8]>>,
    element_size: usize,
    n_elements: usize,
    max_elements: usize,
    range_first: u64,
    cluster_info: ClusterInfo,
}

impl Page {
    /// The null page: no buffer, no elements.
    pub const NULL: Page = Page {
        buffer: None,
        element_size: 0,
        n_elements: 0,
        max_elements: 0,
        range_first: 0,
        cluster_info: ClusterInfo::new(0, 0),
    };

    /// Wrap an allocated buffer.
    ///
    /// # Panics
    /// Panics if the buffer cannot hold `max_elements` elements.
    pub fn from_buffer(buffer: Box<[u8]>, element_size: usize, max_elements: usize) -> Self {
        assert!(
            buffer.len() >= element_size * max_elements,
            "page buffer too small"
        );
        Self {
            buffer: Some(buffer),
            element_size,
            n_elements: 0,
            max_elements,
            range_first: 0,
            cluster_info: ClusterInfo::default(),
        }
    }

    /// Create a null page.
    #[inline]
    pub fn null() -> Self {
        Self::NULL
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.buffer.is_none()
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    #[inline]
    pub fn n_elements(&self) -> usize {
        self.n_elements
    }

    #[inline]
    pub fn max_elements(&self) -> usize {
        self.max_elements
    }

    /// Bytes covered by the current elements.
    #[inline]
    pub fn n_bytes(&self) -> usize {
        self.element_size * self.n_elements
    }

    /// Address of the backing buffer, or null for the null page.
    ///
    /// Only meant for identity checks.
    pub fn buffer_ptr(&self) -> *const u8 {
        self.buffer
            .as_ref()
            .map_or(std::ptr::null(), |b| b.as_ptr())
    }

    /// The bytes of the current elements.
    pub fn as_slice(&self) -> &[u8] {
        match &self.buffer {
            Some(b) => &b[..self.n_bytes()],
            None => &[],
        }
    }

    /// The bytes of the current elements, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let n_bytes = self.n_bytes();
        match &mut self.buffer {
            Some(b) => &mut b[..n_bytes],
            None => &mut [],
        }
    }

    /// Set the element count without checking the capacity.
    ///
    /// Hot path for column readers that already know the page size. The
    /// caller guarantees `n <= max_elements`.
    #[inline]
    pub fn grow_unchecked(&mut self, n: usize) {
        debug_assert!(n <= self.max_elements, "page grown past capacity");
        self.n_elements = n;
    }

    /// Append `n` elements and return their bytes.
    ///
    /// Returns `None` if the page would exceed its capacity.
    pub fn grow(&mut self, n: usize) -> Option<&mut [u8]> {
        let start = self.n_bytes();
        let new_count = self.n_elements.checked_add(n)?;
        if new_count > self.max_elements {
            return None;
        }
        self.n_elements = new_count;
        let end = self.n_bytes();
        self.buffer.as_mut().map(|b| &mut b[start..end])
    }

    /// Drop all elements, keeping the buffer.
    pub fn reset(&mut self) {
        self.n_elements = 0;
    }

    /// Stamp the page with the rows it represents.
    ///
    /// Must happen before the page becomes visible through the pool. Fails
    /// with [`Error::InvalidWindow`] if the page would start before its
    /// cluster; the page keeps its previous window then.
    pub fn set_window(&mut self, range_first: u64, cluster_info: ClusterInfo) -> Result<()> {
        if range_first < cluster_info.index_offset {
            return Err(Error::InvalidWindow {
                range_first,
                index_offset: cluster_info.index_offset,
            });
        }
        self.range_first = range_first;
        self.cluster_info = cluster_info;
        Ok(())
    }

    #[inline]
    pub fn cluster_info(&self) -> ClusterInfo {
        self.cluster_info
    }

    #[inline]
    pub fn global_range_first(&self) -> u64 {
        self.range_first
    }

    /// Global index of the last element. Meaningless for an empty page.
    #[inline]
    pub fn global_range_last(&self) -> u64 {
        (self.range_first + self.n_elements as u64).saturating_sub(1)
    }

    /// Cluster-local index of the first element.
    #[inline]
    pub fn cluster_range_first(&self) -> u64 {
        self.range_first - self.cluster_info.index_offset
    }

    /// Cluster-local index of the last element. Meaningless for an empty page.
    #[inline]
    pub fn cluster_range_last(&self) -> u64 {
        (self.cluster_range_first() + self.n_elements as u64).saturating_sub(1)
    }

    /// Whether the page holds the row with the given global index.
    pub fn contains(&self, global_index: u64) -> bool {
        !self.is_null()
            && global_index >= self.range_first
            && global_index < self.range_first + self.n_elements as u64
    }

    /// Whether the page holds the row with the given cluster-local index.
    pub fn contains_cluster_index(&self, index: ClusterIndex) -> bool {
        if self.is_null() || self.cluster_info.id != index.cluster_id {
            return false;
        }
        let first = self.cluster_range_first();
        index.index >= first && index.index < first + self.n_elements as u64
    }

    /// Give up the buffer. Used by allocators to recycle or free it.
    pub fn into_buffer(self) -> Option<Box<[u8]>> {
        self.buffer
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::null()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            element_size: self.element_size,
            n_elements: self.n_elements,
            max_elements: self.max_elements,
            range_first: self.range_first,
            cluster_info: self.cluster_info,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
