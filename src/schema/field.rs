//! Field builders.
//!
//! A [`Field`] is an owned, detached description of a (sub)tree of typed
//! fields. It becomes part of a schema when a [`SchemaModel`] attaches it to
//! its field tree.
//!
//! [`SchemaModel`]: super::SchemaModel

use std::collections::HashSet;
use std::fmt;

use crate::common::{Error, Result};
use crate::storage::page::ElementType;

/// Type name of the cardinality leaf.
pub const CARDINALITY_TYPE_NAME: &str = "columnardb::Cardinality<std::uint64_t>";

/// Name given to the item field of collections and arrays.
pub const ITEM_FIELD_NAME: &str = "_0";

/// Most item values a fixed-size array may hold, counting nested arrays.
pub const MAX_ARRAY_ELEMENTS: u64 = 1 << 24;

// ============================================================================
// Structure and kinds
// ============================================================================

/// Structural role of a field in the column layout.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structure {
    Leaf = 0,
    Record = 1,
    Collection = 2,
    Variant = 3,
    Unsplit = 4,
}

impl Structure {
    /// Convert from u8, returning `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Structure::Leaf),
            1 => Some(Structure::Record),
            2 => Some(Structure::Collection),
            3 => Some(Structure::Variant),
            4 => Some(Structure::Unsplit),
            _ => None,
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Fundamental types a leaf field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 13] = [
        PrimitiveType::Bool,
        PrimitiveType::Char,
        PrimitiveType::Int8,
        PrimitiveType::UInt8,
        PrimitiveType::Int16,
        PrimitiveType::UInt16,
        PrimitiveType::Int32,
        PrimitiveType::UInt32,
        PrimitiveType::Int64,
        PrimitiveType::UInt64,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::String,
    ];

    /// Canonical type name.
    pub const fn type_name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::Char => "char",
            PrimitiveType::Int8 => "std::int8_t",
            PrimitiveType::UInt8 => "std::uint8_t",
            PrimitiveType::Int16 => "std::int16_t",
            PrimitiveType::UInt16 => "std::uint16_t",
            PrimitiveType::Int32 => "std::int32_t",
            PrimitiveType::UInt32 => "std::uint32_t",
            PrimitiveType::Int64 => "std::int64_t",
            PrimitiveType::UInt64 => "std::uint64_t",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::String => "std::string",
        }
    }

    /// Parse a canonical type name or one of the common aliases.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let canonical = match type_name {
            "int" => "std::int32_t",
            "unsigned int" => "std::uint32_t",
            "int8_t" | "std::int8_t" => "std::int8_t",
            "uint8_t" => "std::uint8_t",
            "int16_t" => "std::int16_t",
            "uint16_t" => "std::uint16_t",
            "int32_t" => "std::int32_t",
            "uint32_t" => "std::uint32_t",
            "int64_t" => "std::int64_t",
            "uint64_t" => "std::uint64_t",
            "string" => "std::string",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|p| p.type_name() == canonical)
    }

    /// In-memory column types of the representation.
    pub const fn column_types(self) -> &'static [ElementType] {
        match self {
            PrimitiveType::Bool => &[ElementType::Bool],
            PrimitiveType::Char => &[ElementType::Char],
            PrimitiveType::Int8 => &[ElementType::Int8],
            PrimitiveType::UInt8 => &[ElementType::UInt8],
            PrimitiveType::Int16 => &[ElementType::Int16],
            PrimitiveType::UInt16 => &[ElementType::UInt16],
            PrimitiveType::Int32 => &[ElementType::Int32],
            PrimitiveType::UInt32 => &[ElementType::UInt32],
            PrimitiveType::Int64 => &[ElementType::Int64],
            PrimitiveType::UInt64 => &[ElementType::UInt64],
            PrimitiveType::Float => &[ElementType::Float32],
            PrimitiveType::Double => &[ElementType::Float64],
            // offsets plus characters
            PrimitiveType::String => &[ElementType::Index64, ElementType::Char],
        }
    }
}

/// Concrete kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Primitive(PrimitiveType),
    Record,
    /// `std::vector<T>` with one item field.
    Collection,
    /// `std::array<T, N>` with one item field repeated `N` times.
    Array(u64),
    /// `std::variant<...>` with one field per alternative.
    Variant,
    /// Opaque, stored as a single blob.
    Unsplit,
    /// Element count of a collection. Only useful as a projected field.
    Cardinality,
}

impl FieldKind {
    pub fn structure(self) -> Structure {
        match self {
            FieldKind::Primitive(_) | FieldKind::Array(_) | FieldKind::Cardinality => {
                Structure::Leaf
            }
            FieldKind::Record => Structure::Record,
            FieldKind::Collection => Structure::Collection,
            FieldKind::Variant => Structure::Variant,
            FieldKind::Unsplit => Structure::Unsplit,
        }
    }

    /// Repetition count, nonzero only for fixed-size arrays.
    pub fn repetition(self) -> u64 {
        match self {
            FieldKind::Array(n) => n,
            _ => 0,
        }
    }

    /// In-memory column types this field writes.
    pub fn column_types(self) -> &'static [ElementType] {
        match self {
            FieldKind::Primitive(p) => p.column_types(),
            FieldKind::Collection => &[ElementType::Index64],
            FieldKind::Variant => &[ElementType::Switch],
            FieldKind::Unsplit => &[ElementType::Index64, ElementType::Raw],
            FieldKind::Record | FieldKind::Array(_) | FieldKind::Cardinality => &[],
        }
    }
}

// ============================================================================
// Field
// ============================================================================

/// An owned field tree waiting to be attached to a model.
///
/// # Example
/// ```
/// use columnardb::schema::{Field, Structure};
///
/// let jets = Field::new("jets", "std::vector<float>").unwrap();
/// assert_eq!(jets.structure(), Structure::Collection);
/// assert_eq!(jets.children()[0].name(), "_0");
/// assert_eq!(jets.children()[0].type_name(), "float");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    type_name: String,
    kind: FieldKind,
    children: Vec<Field>,
}

impl Field {
    /// Create a field from a type name.
    ///
    /// Understands the primitive types, `std::vector<T>`, `std::array<T,N>`,
    /// `std::variant<...>` and the cardinality type, nested arbitrarily.
    pub fn new(name: impl Into<String>, type_name: &str) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        let type_name = type_name.trim();

        if type_name == CARDINALITY_TYPE_NAME {
            return Ok(Self::leaf_unchecked(name, type_name, FieldKind::Cardinality));
        }
        if let Some(inner) = template_args(type_name, "std::vector") {
            return Self::collection(name, Field::new(ITEM_FIELD_NAME, inner)?);
        }
        if let Some(inner) = template_args(type_name, "std::array") {
            let args = split_template_args(inner);
            let (item, size) = match args.as_slice() {
                [item, size] => (*item, *size),
                _ => return Err(Error::UnknownType(type_name.to_string())),
            };
            let n = size
                .parse::<u64>()
                .map_err(|_| Error::UnknownType(type_name.to_string()))?;
            return Self::array(name, Field::new(ITEM_FIELD_NAME, item)?, n);
        }
        if let Some(inner) = template_args(type_name, "std::variant") {
            let alternatives = split_template_args(inner)
                .into_iter()
                .map(|alt| Field::new(ITEM_FIELD_NAME, alt))
                .collect::<Result<Vec<_>>>()?;
            return Self::variant(name, alternatives);
        }

        let primitive = PrimitiveType::from_type_name(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        Self::primitive(name, primitive)
    }

    /// Create a primitive leaf.
    pub fn primitive(name: impl Into<String>, primitive: PrimitiveType) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        Ok(Self::leaf_unchecked(
            name,
            primitive.type_name(),
            FieldKind::Primitive(primitive),
        ))
    }

    /// Create a record of the given sub-fields. Member names must be unique.
    pub fn record(
        name: impl Into<String>,
        type_name: impl Into<String>,
        members: Vec<Field>,
    ) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        let mut seen = HashSet::new();
        for member in &members {
            if !seen.insert(member.name.as_str()) {
                return Err(Error::DuplicateFieldName(member.name.clone()));
            }
        }
        Ok(Field {
            name,
            type_name: type_name.into(),
            kind: FieldKind::Record,
            children: members,
        })
    }

    /// Create a `std::vector` of `item`. The item is renamed to `_0`.
    pub fn collection(name: impl Into<String>, item: Field) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        Ok(Field {
            name,
            type_name: format!("std::vector<{}>", item.type_name),
            kind: FieldKind::Collection,
            children: vec![item.renamed(ITEM_FIELD_NAME)],
        })
    }

    /// Create a `std::array` of `size` copies of `item`. The item is renamed
    /// to `_0`.
    pub fn array(name: impl Into<String>, item: Field, size: u64) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        ensure_array_size(&item, size)?;
        Ok(Field {
            name,
            type_name: format!("std::array<{},{}>", item.type_name, size),
            kind: FieldKind::Array(size),
            children: vec![item.renamed(ITEM_FIELD_NAME)],
        })
    }

    /// Create a `std::variant` over the alternatives, renamed `_0`, `_1`, ...
    pub fn variant(name: impl Into<String>, alternatives: Vec<Field>) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        if alternatives.is_empty() {
            return Err(Error::UnknownType("std::variant<>".to_string()));
        }
        let type_name = format!(
            "std::variant<{}>",
            alternatives
                .iter()
                .map(|alt| alt.type_name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );
        let children = alternatives
            .into_iter()
            .enumerate()
            .map(|(i, alt)| alt.renamed(format!("_{}", i)))
            .collect();
        Ok(Field {
            name,
            type_name,
            kind: FieldKind::Variant,
            children,
        })
    }

    /// Create an opaque field of an arbitrary type.
    pub fn unsplit(name: impl Into<String>, type_name: impl Into<String>) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        Ok(Field {
            name,
            type_name: type_name.into(),
            kind: FieldKind::Unsplit,
            children: Vec::new(),
        })
    }

    /// Create a cardinality leaf.
    pub fn cardinality(name: impl Into<String>) -> Result<Field> {
        let name = name.into();
        validate_field_name(&name)?;
        Ok(Self::leaf_unchecked(
            name,
            CARDINALITY_TYPE_NAME,
            FieldKind::Cardinality,
        ))
    }

    /// Assemble a field from already validated parts.
    pub(crate) fn from_parts(
        name: String,
        type_name: String,
        kind: FieldKind,
        children: Vec<Field>,
    ) -> Field {
        Field {
            name,
            type_name,
            kind,
            children,
        }
    }

    fn leaf_unchecked(name: String, type_name: &str, kind: FieldKind) -> Field {
        Field {
            name,
            type_name: type_name.to_string(),
            kind,
            children: Vec::new(),
        }
    }

    fn renamed(mut self, name: impl Into<String>) -> Field {
        self.name = name.into();
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[inline]
    pub fn structure(&self) -> Structure {
        self.kind.structure()
    }

    #[inline]
    pub fn repetition(&self) -> u64 {
        self.kind.repetition()
    }

    pub fn children(&self) -> &[Field] {
        &self.children
    }

    /// Number of values in a default-constructed instance.
    ///
    /// Arrays multiply, records add up, everything else counts once.
    pub fn value_count(&self) -> u64 {
        match self.kind {
            FieldKind::Array(n) => n.saturating_mul(self.first_child_value_count()),
            FieldKind::Record => self
                .children
                .iter()
                .fold(0u64, |sum, c| sum.saturating_add(c.value_count()))
                .max(1),
            FieldKind::Variant => self.first_child_value_count(),
            _ => 1,
        }
    }

    fn first_child_value_count(&self) -> u64 {
        self.children.first().map_or(1, Field::value_count)
    }

    pub(crate) fn into_parts(self) -> (String, String, FieldKind, Vec<Field>) {
        (self.name, self.type_name, self.kind, self.children)
    }
}

/// Check that an array of `size` copies of `item` is nonzero and within
/// [`MAX_ARRAY_ELEMENTS`].
pub(crate) fn ensure_array_size(item: &Field, size: u64) -> Result<()> {
    let total = size.saturating_mul(item.value_count());
    if size == 0 || total > MAX_ARRAY_ELEMENTS {
        return Err(Error::UnknownType(format!(
            "std::array<{},{}>",
            item.type_name, size
        )));
    }
    Ok(())
}

/// Check that `name` can name a field.
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidFieldName {
            name: name.to_string(),
            reason: "name cannot be empty",
        });
    }
    if name.contains('.') {
        return Err(Error::InvalidFieldName {
            name: name.to_string(),
            reason: "name cannot contain dots",
        });
    }
    Ok(())
}

/// `Some(args)` if `type_name` is `template<args>`.
fn template_args<'a>(type_name: &'a str, template: &str) -> Option<&'a str> {
    type_name
        .strip_prefix(template)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

/// Split template arguments at top-level commas.
fn split_template_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(args[start..].trim());
    parts
}
