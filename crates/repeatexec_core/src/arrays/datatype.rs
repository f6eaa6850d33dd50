use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical types supported in tuple layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
    Utf8,
    Binary,
}

impl DataType {
    /// Width in bytes of the inline encoding of a value of this type.
    ///
    /// Varlen types store a heap reference inline (offset and length, both
    /// u32).
    pub const fn inline_width(&self) -> usize {
        match self {
            DataType::Boolean | DataType::Int8 => 1,
            DataType::Int16 | DataType::Float16 => 2,
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::Float64 => 8,
            DataType::Utf8 | DataType::Binary => 8,
        }
    }

    /// If values of this type are written to the heap portion of an arena.
    pub const fn is_varlen(&self) -> bool {
        matches!(self, DataType::Utf8 | DataType::Binary)
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float16 => write!(f, "Float16"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Binary => write!(f, "Binary"),
        }
    }
}
