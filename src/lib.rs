//! columnardb - In-memory core of a columnar storage engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           columnardb                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Schema Model (schema/)                      │   │
//! │  │   Field → FieldTree → SchemaModel → Entry / Bulk         │   │
//! │  │   ProjectedFields, Writer + Updater                      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Format Compatibility (format/)                 │   │
//! │  │   FeatureFlags + Descriptor → Serializer (two-pass)      │   │
//! │  │   Sink (write side)  |  Source (read side, fail closed)  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Page Pool (buffer/)                         │   │
//! │  │     PagePool + PooledPage + PageRef + Statistics         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │     Page + PageAllocator + single-file container         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (ids, Error, config)
//! - [`storage`] - Pages, allocators and the file container
//! - [`buffer`] - The page pool
//! - [`schema`] - Fields, models, entries and the writer
//! - [`format`] - Descriptors, feature flags and serialization
//!
//! # Quick Start
//! ```
//! use columnardb::format::{MemorySink, Source};
//! use columnardb::schema::{Field, SchemaModel, Writer};
//!
//! let mut model = SchemaModel::create();
//! model.add_field(Field::new("pt", "float").unwrap()).unwrap();
//!
//! let mut writer = Writer::new(model, MemorySink::new(), "events").unwrap();
//! writer.fill_default().unwrap();
//!
//! let mut source = writer.commit().unwrap().into_source();
//! source.attach().unwrap();
//! assert_eq!(source.descriptor().unwrap().n_entries(), 1);
//! ```

pub mod buffer;
pub mod common;
pub mod format;
pub mod schema;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::WriteOptions;
pub use common::{ClusterIndex, ColumnId, Error, ModelId, Result, SchemaId};

pub use buffer::{PagePool, PagePoolStats, PageRef, PoolKey, StatsSnapshot};
pub use format::{Descriptor, FeatureFlags, Sink, Source};
pub use schema::{Entry, Field, SchemaModel, Value, Writer};
pub use storage::page::{ElementType, Page, PageAllocator};
