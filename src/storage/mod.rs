//! Storage layer - pages and the file container.
//!
//! This module handles the memory side of column storage and the minimal
//! framing used by the file collaborators:
//! - [`page`] - Page buffers, element types and allocators
//! - [`ContainerWriter`] / [`ContainerReader`] - Single-file framing

mod container;
pub mod page;

pub use container::{ContainerFrame, ContainerReader, ContainerWriter, CONTAINER_MAGIC};
