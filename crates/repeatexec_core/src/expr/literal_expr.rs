use std::fmt;

use repeatexec_error::{DbError, Result};

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::{BorrowedScalarValue, ScalarValue};

/// A constant value, produced for every row.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalLiteralExpr {
    pub value: ScalarValue,
    /// Type of the literal. Needed for typed nulls.
    pub datatype: DataType,
}

impl PhysicalLiteralExpr {
    /// Create a literal from a non-null value.
    pub fn try_new(value: impl Into<ScalarValue>) -> Result<Self> {
        let value = value.into();
        let datatype = value
            .datatype()
            .ok_or_else(|| DbError::new("Cannot infer type for a null literal"))?;
        Ok(PhysicalLiteralExpr { value, datatype })
    }

    pub const fn typed_null(datatype: DataType) -> Self {
        PhysicalLiteralExpr {
            value: ScalarValue::Null,
            datatype,
        }
    }

    pub fn eval(&self) -> BorrowedScalarValue<'_> {
        self.value.as_borrowed()
    }
}

impl fmt::Display for PhysicalLiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
