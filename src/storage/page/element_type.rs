//! In-memory element types of page buffers.

use std::fmt;

/// The in-memory type of the elements a page holds.
///
/// Part of the page pool key: two pages of the same column but different
/// element types are different pool entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Untyped bytes.
    Raw,
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
    Float32,
    Float64,
    /// Collection offsets.
    Index64,
    /// Variant tag plus offset.
    Switch,
}

impl ElementType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementType::Raw
            | ElementType::Bool
            | ElementType::Char
            | ElementType::Int8
            | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64
            | ElementType::UInt64
            | ElementType::Float64
            | ElementType::Index64 => 8,
            // 64-bit index plus 32-bit tag
            ElementType::Switch => 12,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
