use std::fmt;

use repeatexec_error::{DbError, Result};

use crate::arrays::datatype::DataType;
use crate::arrays::row::batch::RowRef;
use crate::arrays::row::layout::TupleLayout;
use crate::arrays::scalar::BorrowedScalarValue;

/// Reads a single slot from the input row by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalColumnExpr {
    pub idx: usize,
    pub datatype: DataType,
    opened: bool,
}

impl PhysicalColumnExpr {
    pub const fn new(idx: usize, datatype: DataType) -> Self {
        PhysicalColumnExpr {
            idx,
            datatype,
            opened: false,
        }
    }

    pub fn open(&mut self, input: &TupleLayout) -> Result<()> {
        let slot = input.slots().get(self.idx).ok_or_else(|| {
            DbError::new("Column expression references missing input column")
                .with_field("idx", self.idx)
                .with_field("num_columns", input.num_slots())
        })?;

        if slot.datatype != self.datatype {
            return Err(DbError::new("Column expression type does not match input")
                .with_field("idx", self.idx)
                .with_field("expected", self.datatype)
                .with_field("input", slot.datatype));
        }

        self.opened = true;
        Ok(())
    }

    pub fn eval<'a>(&self, row: RowRef<'a>) -> Result<BorrowedScalarValue<'a>> {
        debug_assert!(self.opened, "column expression evaluated before open");
        row.value(self.idx)
    }

    pub fn close(&mut self) {
        self.opened = false;
    }
}

impl From<(usize, DataType)> for PhysicalColumnExpr {
    fn from((idx, datatype): (usize, DataType)) -> Self {
        PhysicalColumnExpr::new(idx, datatype)
    }
}

impl fmt::Display for PhysicalColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.idx)
    }
}
