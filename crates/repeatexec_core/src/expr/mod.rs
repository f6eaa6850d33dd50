//! Physical expressions used to extract values out of input rows.

pub mod column_expr;
pub mod literal_expr;

use std::fmt;

use repeatexec_error::Result;

use self::column_expr::PhysicalColumnExpr;
use self::literal_expr::PhysicalLiteralExpr;
use crate::arrays::datatype::DataType;
use crate::arrays::row::batch::RowRef;
use crate::arrays::row::layout::TupleLayout;
use crate::arrays::scalar::BorrowedScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalScalarExpression {
    Column(PhysicalColumnExpr),
    Literal(PhysicalLiteralExpr),
}

impl PhysicalScalarExpression {
    pub fn datatype(&self) -> DataType {
        match self {
            Self::Column(expr) => expr.datatype,
            Self::Literal(expr) => expr.datatype,
        }
    }

    /// Prepare the expression for evaluation against rows of the given input
    /// layout.
    pub fn open(&mut self, input: &TupleLayout) -> Result<()> {
        match self {
            Self::Column(expr) => expr.open(input),
            Self::Literal(_) => Ok(()),
        }
    }

    /// Evaluate the expression for a single input row.
    pub fn eval<'a>(&'a self, row: RowRef<'a>) -> Result<BorrowedScalarValue<'a>> {
        match self {
            Self::Column(expr) => expr.eval(row),
            Self::Literal(expr) => Ok(expr.eval()),
        }
    }

    pub fn close(&mut self) {
        if let Self::Column(expr) = self {
            expr.close()
        }
    }
}

impl From<PhysicalColumnExpr> for PhysicalScalarExpression {
    fn from(value: PhysicalColumnExpr) -> Self {
        PhysicalScalarExpression::Column(value)
    }
}

impl From<PhysicalLiteralExpr> for PhysicalScalarExpression {
    fn from(value: PhysicalLiteralExpr) -> Self {
        PhysicalScalarExpression::Literal(value)
    }
}

impl fmt::Display for PhysicalScalarExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(expr) => write!(f, "{expr}"),
            Self::Literal(expr) => write!(f, "{expr}"),
        }
    }
}
