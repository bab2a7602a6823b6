//! Schema model.
//!
//! This module describes what a dataset looks like and how entries of it are
//! built:
//! - [`Field`] - Detached field description, built by the field factory
//! - [`FieldTree`] - Arena of attached fields below the zero field
//! - [`SchemaModel`] - Fields, projected fields and the frozen/unfrozen lifecycle
//! - [`Entry`] / [`FieldToken`] / [`Bulk`] - Values of one or many rows
//! - [`Writer`] / [`Updater`] - Filling entries and extending a live schema
//!
//! # Lifecycle
//! ```text
//!   create() ──add_field()──► unfrozen ──freeze()──► frozen ──create_entry()──► Entry
//!                                ▲                     │
//!                                └────unfreeze()───────┘  (new model and schema ids)
//! ```

mod bulk;
mod entry;
mod field;
mod model;
mod projected;
mod tree;
mod updater;
mod value;
mod writer;

pub use bulk::Bulk;
pub use entry::{Entry, FieldToken};
pub use field::{
    validate_field_name, Field, FieldKind, PrimitiveType, Structure, CARDINALITY_TYPE_NAME,
    ITEM_FIELD_NAME, MAX_ARRAY_ELEMENTS,
};
pub(crate) use field::ensure_array_size;
pub use model::SchemaModel;
pub use projected::{ensure_valid_mapping, FieldMap, ProjectedFields};
pub use tree::{FieldId, FieldNode, FieldTree};
pub use updater::{Changeset, Updater};
pub use value::Value;
pub use writer::Writer;
