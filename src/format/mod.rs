//! Format compatibility layer.
//!
//! This module turns a [`SchemaModel`](crate::schema::SchemaModel) into
//! bytes and back:
//! - [`FeatureFlags`] - Optional format capabilities; readers fail closed
//! - [`Descriptor`] / [`DescriptorBuilder`] - Serializable dataset summary
//! - [`Serializer`] - Two-pass header and footer envelopes
//! - [`Sink`] / [`Source`] - Collaborators that store and load envelopes

mod codec;
mod descriptor;
mod feature;
mod serializer;
mod sink;
mod source;

pub use descriptor::{Descriptor, DescriptorBuilder, FieldDescriptor};
pub use feature::{FeatureFlags, FEATURE_FLAG_TEST, SUPPORTED_FEATURES};
pub use serializer::{
    SerializationContext, Serializer, FOOTER_MAGIC, FORMAT_VERSION, HEADER_MAGIC,
};
pub use sink::{FileSink, MemorySink, SchemaUpdate, Sink};
pub use source::{FileSource, MemorySource, Source};
