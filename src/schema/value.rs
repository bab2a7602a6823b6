//! In-memory field values.

use super::field::{FieldKind, PrimitiveType};

/// The value of one field for one entry.
///
/// Compound fields nest: a record holds one value per member, a collection
/// one value per element.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Record(Vec<Value>),
    Collection(Vec<Value>),
    Array(Vec<Value>),
    Variant { index: u32, value: Box<Value> },
    Unsplit(Vec<u8>),
    Cardinality(u64),
}

impl Value {
    /// Default-constructed value of a primitive type.
    pub fn default_of(primitive: PrimitiveType) -> Value {
        match primitive {
            PrimitiveType::Bool => Value::Bool(false),
            PrimitiveType::Char => Value::Char(0),
            PrimitiveType::Int8 => Value::Int8(0),
            PrimitiveType::UInt8 => Value::UInt8(0),
            PrimitiveType::Int16 => Value::Int16(0),
            PrimitiveType::UInt16 => Value::UInt16(0),
            PrimitiveType::Int32 => Value::Int32(0),
            PrimitiveType::UInt32 => Value::UInt32(0),
            PrimitiveType::Int64 => Value::Int64(0),
            PrimitiveType::UInt64 => Value::UInt64(0),
            PrimitiveType::Float => Value::Float(0.0),
            PrimitiveType::Double => Value::Double(0.0),
            PrimitiveType::String => Value::String(String::new()),
        }
    }

    /// Whether the value has the outer shape of `kind`.
    ///
    /// Nested values are not inspected.
    pub fn fits(&self, kind: FieldKind) -> bool {
        match (kind, self) {
            (FieldKind::Primitive(p), value) => {
                std::mem::discriminant(value) == std::mem::discriminant(&Value::default_of(p))
            }
            (FieldKind::Record, Value::Record(_))
            | (FieldKind::Collection, Value::Collection(_))
            | (FieldKind::Variant, Value::Variant { .. })
            | (FieldKind::Unsplit, Value::Unsplit(_))
            | (FieldKind::Cardinality, Value::Cardinality(_)) => true,
            (FieldKind::Array(n), Value::Array(items)) => items.len() as u64 == n,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
