//! Page pool management.
//!
//! The page pool is the in-memory cache of decoded column pages shared by
//! column readers. Pages are moved in by their producers, looked up by row
//! index, and leave only through explicit eviction.
//!
//! # Components
//! - [`PagePool`] - The page cache
//! - [`PooledPage`] - A pooled page plus its key, window and use count
//! - [`PageRef`] - RAII reference to a pooled page
//! - [`PagePoolStats`] - Performance statistics

mod page_pool;
mod page_ref;
mod pooled_page;
mod stats;

pub use page_pool::PagePool;
pub use page_ref::PageRef;
pub use pooled_page::{PoolKey, PooledPage};
pub use stats::{PagePoolStats, StatsSnapshot};
