use repeatexec_error::{DbError, Result};

use super::plan::GroupingPlan;
use crate::arrays::row::batch::RowBatch;
use crate::expr::PhysicalScalarExpression;

/// Writes output records for a single grouping combination.
#[derive(Debug, Clone, Copy)]
pub struct TupleWriter<'a> {
    plan: &'a GroupingPlan,
    exprs: &'a [PhysicalScalarExpression],
}

impl<'a> TupleWriter<'a> {
    pub fn new(plan: &'a GroupingPlan, exprs: &'a [PhysicalScalarExpression]) -> Self {
        debug_assert_eq!(plan.num_value_slots(), exprs.len());
        TupleWriter { plan, exprs }
    }

    /// Write one output record per input row for `combination`.
    ///
    /// On error, `output` may contain a partial set of rows and should be
    /// reset by the caller.
    pub fn write_combination(
        &self,
        input: &RowBatch,
        combination: usize,
        output: &mut RowBatch,
    ) -> Result<()> {
        if output.capacity() < input.num_rows() {
            return Err(DbError::new("Output batch too small for input batch")
                .with_field("output_capacity", output.capacity())
                .with_field("input_rows", input.num_rows()));
        }

        let null_mask = self.plan.null_mask(combination);
        let indicator_offset = self.plan.num_value_slots();

        for row in input.rows() {
            let mut record = output.append_record()?;
            record.clear_nulls();

            for (pos, expr) in self.exprs.iter().enumerate() {
                if null_mask.value(pos) {
                    record.set_null(pos);
                    continue;
                }
                let value = expr.eval(row)?;
                record.write_value(pos, &value)?;
            }

            for (idx, value) in self.plan.indicator_values(combination).enumerate() {
                record.write_integer(indicator_offset + idx, value)?;
            }

            record.commit();
        }

        Ok(())
    }
}
