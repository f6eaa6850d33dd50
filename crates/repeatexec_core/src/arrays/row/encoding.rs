//! Encoding and decoding of inline values within a record.
//!
//! Fixed-width values are written little-endian directly into their slot.
//! Varlen values are written to the arena heap with only a `HeapRef` stored
//! inline.

use std::borrow::Cow;

use half::f16;
use repeatexec_error::{DbError, Result, ResultExt};

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::BorrowedScalarValue;
use crate::buffer::arena::HeapRef;

/// Write a fixed-width value into `buf`.
///
/// `buf` must be exactly the inline width of `datatype`. Errors if the value
/// doesn't match the datatype, or if the value is varlen or null.
pub fn write_fixed(buf: &mut [u8], datatype: DataType, value: &BorrowedScalarValue) -> Result<()> {
    debug_assert_eq!(buf.len(), datatype.inline_width());

    match (datatype, value) {
        (DataType::Boolean, BorrowedScalarValue::Boolean(v)) => buf[0] = *v as u8,
        (DataType::Int8, BorrowedScalarValue::Int8(v)) => buf.copy_from_slice(&v.to_le_bytes()),
        (DataType::Int16, BorrowedScalarValue::Int16(v)) => buf.copy_from_slice(&v.to_le_bytes()),
        (DataType::Int32, BorrowedScalarValue::Int32(v)) => buf.copy_from_slice(&v.to_le_bytes()),
        (DataType::Int64, BorrowedScalarValue::Int64(v)) => buf.copy_from_slice(&v.to_le_bytes()),
        (DataType::Float16, BorrowedScalarValue::Float16(v)) => {
            buf.copy_from_slice(&v.to_le_bytes())
        }
        (DataType::Float32, BorrowedScalarValue::Float32(v)) => {
            buf.copy_from_slice(&v.to_le_bytes())
        }
        (DataType::Float64, BorrowedScalarValue::Float64(v)) => {
            buf.copy_from_slice(&v.to_le_bytes())
        }
        (datatype, value) => {
            return Err(DbError::new("Value does not match fixed-width slot type")
                .with_field("datatype", datatype)
                .with_field("value", value));
        }
    }

    Ok(())
}

/// Write an integer into a slot of some integer type.
///
/// Errors if the value does not fit in the type.
pub fn write_integer(buf: &mut [u8], datatype: DataType, value: i64) -> Result<()> {
    let out_of_range = || {
        DbError::new("Integer out of range for slot type")
            .with_field("datatype", datatype)
            .with_field("value", value)
    };

    match datatype {
        DataType::Int8 => {
            let v = i8::try_from(value).map_err(|_| out_of_range())?;
            buf.copy_from_slice(&v.to_le_bytes());
        }
        DataType::Int16 => {
            let v = i16::try_from(value).map_err(|_| out_of_range())?;
            buf.copy_from_slice(&v.to_le_bytes());
        }
        DataType::Int32 => {
            let v = i32::try_from(value).map_err(|_| out_of_range())?;
            buf.copy_from_slice(&v.to_le_bytes());
        }
        DataType::Int64 => buf.copy_from_slice(&value.to_le_bytes()),
        other => {
            return Err(DbError::new("Slot type is not an integer").with_field("datatype", other));
        }
    }

    Ok(())
}

/// Check that an integer fits in the given integer type without writing it.
pub fn integer_fits(datatype: DataType, value: i64) -> bool {
    match datatype {
        DataType::Int8 => i8::try_from(value).is_ok(),
        DataType::Int16 => i16::try_from(value).is_ok(),
        DataType::Int32 => i32::try_from(value).is_ok(),
        DataType::Int64 => true,
        _ => false,
    }
}

/// Get the bytes to write to the heap for a varlen value.
pub fn varlen_bytes<'b>(
    datatype: DataType,
    value: &'b BorrowedScalarValue,
) -> Result<&'b [u8]> {
    match (datatype, value) {
        (DataType::Utf8, BorrowedScalarValue::Utf8(v)) => Ok(v.as_bytes()),
        (DataType::Binary, BorrowedScalarValue::Binary(v)) => Ok(v.as_ref()),
        (datatype, value) => Err(DbError::new("Value does not match varlen slot type")
            .with_field("datatype", datatype)
            .with_field("value", value)),
    }
}

/// Read an inline value.
///
/// `heap` is the heap region of the arena the record was written to.
pub fn read_value<'a>(
    buf: &'a [u8],
    heap: &'a [u8],
    datatype: DataType,
) -> Result<BorrowedScalarValue<'a>> {
    fn arr<const N: usize>(buf: &[u8]) -> [u8; N] {
        let mut out = [0; N];
        out.copy_from_slice(&buf[..N]);
        out
    }

    Ok(match datatype {
        DataType::Boolean => BorrowedScalarValue::Boolean(buf[0] != 0),
        DataType::Int8 => BorrowedScalarValue::Int8(i8::from_le_bytes(arr(buf))),
        DataType::Int16 => BorrowedScalarValue::Int16(i16::from_le_bytes(arr(buf))),
        DataType::Int32 => BorrowedScalarValue::Int32(i32::from_le_bytes(arr(buf))),
        DataType::Int64 => BorrowedScalarValue::Int64(i64::from_le_bytes(arr(buf))),
        DataType::Float16 => BorrowedScalarValue::Float16(f16::from_le_bytes(arr(buf))),
        DataType::Float32 => BorrowedScalarValue::Float32(f32::from_le_bytes(arr(buf))),
        DataType::Float64 => BorrowedScalarValue::Float64(f64::from_le_bytes(arr(buf))),
        DataType::Utf8 | DataType::Binary => {
            let heap_ref = HeapRef::decode(buf);
            let start = heap_ref.offset as usize;
            let end = start + heap_ref.len as usize;
            let bytes = heap.get(start..end).ok_or_else(|| {
                DbError::new("Heap reference out of bounds")
                    .with_field("offset", heap_ref.offset)
                    .with_field("len", heap_ref.len)
                    .with_field("heap_len", heap.len())
            })?;

            if datatype == DataType::Utf8 {
                let s = std::str::from_utf8(bytes).context("Invalid utf8 in record heap")?;
                BorrowedScalarValue::Utf8(Cow::Borrowed(s))
            } else {
                BorrowedScalarValue::Binary(Cow::Borrowed(bytes))
            }
        }
    })
}
