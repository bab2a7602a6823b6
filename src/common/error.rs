//! Error types for columnardb.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in columnardb.
///
/// Failures fall into four groups:
/// - structural errors raised while building or validating the field tree
/// - lifecycle errors from using a model, entry or token in the wrong state
/// - format errors raised while encoding or decoding a descriptor
/// - I/O errors from the file collaborators
///
/// None of them leave a partially mutated model, projection table or pool behind.
#[derive(Error, Debug)]
pub enum Error {
    // === Structural errors ===
    /// A top-level field with the same name already exists in the model.
    #[error("field name '{0}' already exists in model")]
    DuplicateFieldName(String),

    /// The field name is empty or contains a `.`.
    #[error("invalid field name '{name}': {reason}")]
    InvalidFieldName { name: String, reason: &'static str },

    /// A leaf was requested for a type the field factory does not know.
    #[error("unknown field type: {0}")]
    UnknownType(String),

    /// Path lookup failed.
    #[error("no such field: {0}")]
    NoSuchField(String),

    /// Source and target of a projection have incompatible shapes.
    #[error("field mapping structural mismatch: {source_field} --> {target}")]
    MappingStructureMismatch { source_field: String, target: String },

    /// Source and target leaves have different type names.
    #[error("field mapping type mismatch: {source_field} --> {target}")]
    MappingTypeMismatch { source_field: String, target: String },

    /// Source or target lives below a fixed-size array.
    #[error("unsupported field mapping across fixed-size arrays: {source_field} --> {target}")]
    ArrayMapping { source_field: String, target: String },

    /// The first non-record ancestor of source or target is not a collection.
    #[error("unsupported field mapping ({side} structure): {source_field} --> {target}")]
    UnsupportedMapping {
        side: &'static str,
        source_field: String,
        target: String,
    },

    // === Lifecycle errors ===
    /// Attempted to modify a frozen model.
    #[error("invalid attempt to modify frozen model")]
    ModelFrozen,

    /// Attempted an operation that needs a stable schema on an unfrozen model.
    #[error("invalid attempt to {0} of unfrozen model")]
    ModelNotFrozen(&'static str),

    /// The model was created without a default entry.
    #[error("invalid attempt to use default entry of bare model")]
    BareModel,

    /// Entry ids do not match the live model.
    #[error("mismatch between entry and model: entry (model {entry_model}, schema {entry_schema}), model (model {model}, schema {schema})")]
    StaleEntry {
        entry_model: u64,
        entry_schema: u64,
        model: u64,
        schema: u64,
    },

    /// Token was issued for a different schema.
    #[error("invalid token for this entry: token schema {token_schema}, entry schema {entry_schema}")]
    StaleToken { token_schema: u64, entry_schema: u64 },

    /// A bare entry value was never bound.
    #[error("value of field '{0}' is not bound")]
    UnboundValue(String),

    /// A value of the wrong shape was bound to a field.
    #[error("value does not fit field '{field}' of type {type_name}")]
    ValueTypeMismatch { field: String, type_name: String },

    /// The model is in the middle of a schema update.
    #[error("cannot fill entries while a schema update is in progress")]
    UpdateInProgress,

    /// A source was used before `attach()`.
    #[error("source is not attached")]
    NotAttached,

    // === Format errors ===
    /// The stored dataset uses features this reader does not understand.
    #[error("unsupported format feature: {}", join_flags(.0))]
    UnsupportedFeature(Vec<u32>),

    /// The byte stream is malformed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Envelope checksum does not match its contents.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// Serialization target buffer is smaller than the sizing pass reported.
    #[error("buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// A page window starting before the first row of its cluster.
    #[error("page window starts at row {range_first}, before its cluster at row {index_offset}")]
    InvalidWindow { range_first: u64, index_offset: u64 },

    /// The descriptor under construction violates a structural rule.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    // === I/O errors ===
    /// I/O error from the file collaborators.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_flags(flags: &[u32]) -> String {
    flags
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Whether this error came from validating the shape of the field tree.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::DuplicateFieldName(_)
                | Error::InvalidFieldName { .. }
                | Error::UnknownType(_)
                | Error::NoSuchField(_)
                | Error::MappingStructureMismatch { .. }
                | Error::MappingTypeMismatch { .. }
                | Error::ArrayMapping { .. }
                | Error::UnsupportedMapping { .. }
        )
    }
}
