use std::borrow::Cow;
use std::fmt;

use half::f16;
use repeatexec_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use super::datatype::DataType;

/// A single scalar value, possibly borrowing string or binary data from a
/// record arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BorrowedScalarValue<'a> {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    Utf8(Cow<'a, str>),
    Binary(Cow<'a, [u8]>),
}

pub type ScalarValue = BorrowedScalarValue<'static>;

impl BorrowedScalarValue<'_> {
    /// Get the datatype for this value.
    ///
    /// Returns None for untyped nulls.
    pub fn datatype(&self) -> Option<DataType> {
        Some(match self {
            Self::Null => return None,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float16(_) => DataType::Float16,
            Self::Float32(_) => DataType::Float32,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Binary(_) => DataType::Binary,
        })
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn into_owned(self) -> ScalarValue {
        match self {
            Self::Null => ScalarValue::Null,
            Self::Boolean(v) => ScalarValue::Boolean(v),
            Self::Int8(v) => ScalarValue::Int8(v),
            Self::Int16(v) => ScalarValue::Int16(v),
            Self::Int32(v) => ScalarValue::Int32(v),
            Self::Int64(v) => ScalarValue::Int64(v),
            Self::Float16(v) => ScalarValue::Float16(v),
            Self::Float32(v) => ScalarValue::Float32(v),
            Self::Float64(v) => ScalarValue::Float64(v),
            Self::Utf8(v) => ScalarValue::Utf8(Cow::Owned(v.into_owned())),
            Self::Binary(v) => ScalarValue::Binary(Cow::Owned(v.into_owned())),
        }
    }

    /// Get a value borrowing from this one.
    pub fn as_borrowed(&self) -> BorrowedScalarValue<'_> {
        match self {
            Self::Null => BorrowedScalarValue::Null,
            Self::Boolean(v) => BorrowedScalarValue::Boolean(*v),
            Self::Int8(v) => BorrowedScalarValue::Int8(*v),
            Self::Int16(v) => BorrowedScalarValue::Int16(*v),
            Self::Int32(v) => BorrowedScalarValue::Int32(*v),
            Self::Int64(v) => BorrowedScalarValue::Int64(*v),
            Self::Float16(v) => BorrowedScalarValue::Float16(*v),
            Self::Float32(v) => BorrowedScalarValue::Float32(*v),
            Self::Float64(v) => BorrowedScalarValue::Float64(*v),
            Self::Utf8(v) => BorrowedScalarValue::Utf8(Cow::Borrowed(v.as_ref())),
            Self::Binary(v) => BorrowedScalarValue::Binary(Cow::Borrowed(v.as_ref())),
        }
    }

    /// Try to get the value as an i64, widening smaller integers.
    pub fn try_as_i64(&self) -> Result<i64> {
        match self {
            Self::Int8(i) => Ok(*i as i64),
            Self::Int16(i) => Ok(*i as i64),
            Self::Int32(i) => Ok(*i as i64),
            Self::Int64(i) => Ok(*i),
            other => Err(DbError::new(format!("Not an integer: {other}"))),
        }
    }

    pub fn try_as_usize(&self) -> Result<usize> {
        let v = self.try_as_i64()?;
        usize::try_from(v).map_err(|_| DbError::new(format!("Not a valid usize: {v}")))
    }
}

impl fmt::Display for BorrowedScalarValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float16(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Binary(v) => {
                write!(f, "\\x")?;
                for b in v.iter() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for BorrowedScalarValue<'_> {
    fn from(value: bool) -> Self {
        BorrowedScalarValue::Boolean(value)
    }
}

impl From<i8> for BorrowedScalarValue<'_> {
    fn from(value: i8) -> Self {
        BorrowedScalarValue::Int8(value)
    }
}

impl From<i16> for BorrowedScalarValue<'_> {
    fn from(value: i16) -> Self {
        BorrowedScalarValue::Int16(value)
    }
}

impl From<i32> for BorrowedScalarValue<'_> {
    fn from(value: i32) -> Self {
        BorrowedScalarValue::Int32(value)
    }
}

impl From<i64> for BorrowedScalarValue<'_> {
    fn from(value: i64) -> Self {
        BorrowedScalarValue::Int64(value)
    }
}

impl From<f16> for BorrowedScalarValue<'_> {
    fn from(value: f16) -> Self {
        BorrowedScalarValue::Float16(value)
    }
}

impl From<f32> for BorrowedScalarValue<'_> {
    fn from(value: f32) -> Self {
        BorrowedScalarValue::Float32(value)
    }
}

impl From<f64> for BorrowedScalarValue<'_> {
    fn from(value: f64) -> Self {
        BorrowedScalarValue::Float64(value)
    }
}

impl<'a> From<&'a str> for BorrowedScalarValue<'a> {
    fn from(value: &'a str) -> Self {
        BorrowedScalarValue::Utf8(Cow::Borrowed(value))
    }
}

impl From<String> for BorrowedScalarValue<'_> {
    fn from(value: String) -> Self {
        BorrowedScalarValue::Utf8(Cow::Owned(value))
    }
}

impl<'a> From<&'a [u8]> for BorrowedScalarValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        BorrowedScalarValue::Binary(Cow::Borrowed(value))
    }
}

impl<'a, T> From<Option<T>> for BorrowedScalarValue<'a>
where
    T: Into<BorrowedScalarValue<'a>>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => BorrowedScalarValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widening() {
        assert_eq!(-4, BorrowedScalarValue::Int8(-4).try_as_i64().unwrap());
        assert_eq!(9, BorrowedScalarValue::Int32(9).try_as_usize().unwrap());
        BorrowedScalarValue::Int64(-1).try_as_usize().unwrap_err();
        BorrowedScalarValue::from("a").try_as_i64().unwrap_err();
    }

    #[test]
    fn display_binary() {
        let bytes = [0xde_u8, 0xad];
        let v = BorrowedScalarValue::from(bytes.as_slice());
        assert_eq!("\\xdead", v.to_string());
    }

    #[test]
    fn option_into_scalar() {
        assert_eq!(ScalarValue::Null, ScalarValue::from(None::<i32>));
        assert_eq!(ScalarValue::Int32(3), ScalarValue::from(Some(3)));
    }
}
