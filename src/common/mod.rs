//! Common types and utilities shared across columnardb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and writer options
//! - Error types
//! - Identifiers (ColumnId, ClusterIndex, ModelId, SchemaId)

mod column_id;
pub mod config;
pub mod error;
mod ids;

pub use column_id::{ClusterId, ClusterIndex, ColumnId};
pub use error::{Error, Result};
pub use ids::{IdGenerator, ModelId, SchemaId};
