//! Integration tests for the page pool.
//!
//! These tests drive the pool only through the public API, the way a column
//! reader would.

use columnardb::buffer::{PagePool, PoolKey};
use columnardb::storage::page::{ClusterInfo, ElementType, HeapPageAllocator, Page, PageAllocator};
use columnardb::ClusterIndex;
use std::sync::Arc;
use std::thread;

fn page(allocator: &dyn PageAllocator, first: u64, n: usize, cluster: ClusterInfo) -> Page {
    let mut page = allocator.new_page(ElementType::Float32.size(), n);
    page.grow_unchecked(n);
    page.set_window(first, cluster).unwrap();
    page
}

/// A page of 10 elements starting at row 50 answers for rows 50..=59 only.
#[test]
fn test_window_boundaries() {
    let allocator = HeapPageAllocator::new();
    let pool = PagePool::new();
    let key = PoolKey::new(7, ElementType::Float32);

    let registered = pool.register_page(page(&allocator, 50, 10, ClusterInfo::new(3, 40)), key);

    for row in [50, 55, 59] {
        let page_ref = pool.get_page(key, row);
        assert!(!page_ref.is_null(), "row {} should hit", row);
        assert_eq!(page_ref.get().global_range_first(), 50);
    }
    assert!(pool.get_page(key, 49).is_null());
    assert!(pool.get_page(key, 60).is_null());

    // Cluster 3 starts at global row 40, so the page covers cluster rows 10..=19.
    assert!(!pool.get_page_in_cluster(key, ClusterIndex::new(3, 10)).is_null());
    assert!(!pool.get_page_in_cluster(key, ClusterIndex::new(3, 19)).is_null());
    assert!(pool.get_page_in_cluster(key, ClusterIndex::new(3, 20)).is_null());
    assert!(pool.get_page_in_cluster(key, ClusterIndex::new(4, 10)).is_null());

    drop(registered);
    assert_eq!(pool.use_count(key, 50), Some(0));
}

/// Keys must match on both column and element type.
#[test]
fn test_key_includes_element_type() {
    let allocator = HeapPageAllocator::new();
    let pool = PagePool::new();

    pool.preload_page(
        page(&allocator, 0, 8, ClusterInfo::default()),
        PoolKey::new(1, ElementType::Float32),
    );

    assert!(!pool.get_page(PoolKey::new(1, ElementType::Float32), 3).is_null());
    assert!(pool.get_page(PoolKey::new(1, ElementType::Int32), 3).is_null());
    assert!(pool.get_page(PoolKey::new(2, ElementType::Float32), 3).is_null());
}

/// A null reference reads as the null page and cannot be written.
#[test]
fn test_null_reference() {
    let pool = PagePool::new();
    let page_ref = pool.get_page(PoolKey::new(1, ElementType::Raw), 0);

    assert!(page_ref.is_null());
    assert!(page_ref.key().is_none());
    let page = page_ref.get();
    assert!(page.is_null());
    assert_eq!(page.n_elements(), 0);
    drop(page);
    assert!(page_ref.get_mut().is_none());

    let snapshot = pool.stats().snapshot();
    assert_eq!(snapshot.cache_misses, 1);
    assert_eq!(snapshot.cache_hits, 0);
}

/// Eviction removes idle pages but never one that is still referenced.
#[test]
fn test_evict_with_held_reference() {
    let allocator = Arc::new(HeapPageAllocator::new());
    let pool = PagePool::with_allocator(allocator.clone());
    let key = PoolKey::new(1, ElementType::Float32);

    let held = pool.register_page(page(allocator.as_ref(), 0, 10, ClusterInfo::default()), key);
    pool.preload_page(page(allocator.as_ref(), 10, 10, ClusterInfo::default()), key);
    pool.preload_page(page(allocator.as_ref(), 20, 10, ClusterInfo::default()), key);

    assert_eq!(pool.evict(usize::MAX), 2);
    assert_eq!(pool.len(), 1);
    assert_eq!(allocator.pages_deleted(), 2);
    assert!(!pool.get_page(key, 5).is_null());

    held.get_mut().unwrap().as_mut_slice()[0] = 9;
    assert_eq!(pool.evict(usize::MAX), 0);

    drop(held);
    assert_eq!(pool.evict(usize::MAX), 1);
    assert!(pool.is_empty());
    assert_eq!(allocator.pages_deleted(), 3);
}

/// Readers on many threads share one pool.
#[test]
fn test_concurrent_readers() {
    let allocator = HeapPageAllocator::new();
    let pool = Arc::new(PagePool::new());
    let key = PoolKey::new(1, ElementType::Float32);

    for first in (0..100).step_by(10) {
        pool.preload_page(page(&allocator, first, 10, ClusterInfo::default()), key);
    }

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for row in 0..100u64 {
                    let page_ref = pool.get_page(key, (row + t * 13) % 100);
                    assert!(!page_ref.is_null());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for first in (0..100).step_by(10) {
        assert_eq!(pool.use_count(key, first), Some(0));
    }
    assert_eq!(pool.stats().snapshot().cache_hits, 800);
}
