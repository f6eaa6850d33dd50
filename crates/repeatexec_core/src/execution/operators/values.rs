use std::sync::Arc;

use repeatexec_error::{DbError, Result};

use super::{PhysicalOperator, PollPull};
use crate::arrays::row::batch::RowBatch;
use crate::arrays::row::layout::TupleLayout;
use crate::arrays::scalar::ScalarValue;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::runtime::state::RuntimeState;

/// Emits a fixed set of in-memory rows.
///
/// Rows are written in chunks of at most the output batch's capacity.
/// `Exhausted` is returned alongside the final chunk.
#[derive(Debug)]
pub struct PhysicalValues {
    layout: Arc<TupleLayout>,
    rows: Vec<Vec<ScalarValue>>,
    offset: usize,
}

impl PhysicalValues {
    pub fn new(layout: Arc<TupleLayout>, rows: Vec<Vec<ScalarValue>>) -> Self {
        PhysicalValues {
            layout,
            rows,
            offset: 0,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

impl PhysicalOperator for PhysicalValues {
    fn operator_name(&self) -> &'static str {
        "Values"
    }

    fn output_layout(&self) -> &Arc<TupleLayout> {
        &self.layout
    }

    fn open(&mut self, _state: &RuntimeState) -> Result<()> {
        for (idx, row) in self.rows.iter().enumerate() {
            if row.len() != self.layout.num_slots() {
                return Err(DbError::initialization("Values row has incorrect number of columns")
                    .with_field("row", idx)
                    .with_field("expected", self.layout.num_slots())
                    .with_field("got", row.len()));
            }
        }
        self.offset = 0;
        Ok(())
    }

    fn poll_pull(&mut self, state: &RuntimeState, output: &mut RowBatch) -> Result<PollPull> {
        state.cancellation.check()?;

        let remaining = &self.rows[self.offset..];
        let count = usize::min(remaining.len(), output.capacity());

        for row in &remaining[..count] {
            output.append_scalars(row.iter().map(|v| v.as_borrowed()))?;
        }
        self.offset += count;

        if self.offset >= self.rows.len() {
            Ok(PollPull::Exhausted)
        } else {
            Ok(PollPull::HasMore)
        }
    }

    fn close(&mut self, _state: &RuntimeState) -> Result<()> {
        Ok(())
    }
}

impl Explainable for PhysicalValues {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Values")
            .with_value("num_rows", self.rows.len())
            .with_values("datatypes", self.layout.datatypes())
    }
}
