//! Page types and allocation.
//!
//! This module contains:
//! - [`Page`] - A buffer of decoded column elements plus its row window
//! - [`ClusterInfo`] - The cluster a page belongs to
//! - [`ElementType`] - In-memory element type tag
//! - [`PageAllocator`] / [`HeapPageAllocator`] - Buffer creation and release

mod allocator;
mod element_type;
#[allow(clippy::module_inception)]
mod page;

pub use allocator::{HeapPageAllocator, PageAllocator};
pub use element_type::ElementType;
pub use page::{ClusterInfo, Page};
