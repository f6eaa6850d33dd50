//! Utilities for testing operators.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use repeatexec_error::{DbError, Result};

use crate::arrays::datatype::DataType;
use crate::arrays::row::batch::RowBatch;
use crate::arrays::row::layout::{DescriptorTable, SlotDescriptor, TupleLayout};
use crate::arrays::scalar::ScalarValue;
use crate::config::execution::ExecutionConfig;
use crate::execution::operators::{PhysicalOperator, PollPull};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::runtime::state::RuntimeState;

/// Create a layout from `(slot_id, datatype, nullable)` triples.
pub fn test_layout(id: u32, slots: &[(u32, DataType, bool)]) -> TupleLayout {
    TupleLayout::new(
        id,
        slots
            .iter()
            .map(|&(slot, datatype, nullable)| SlotDescriptor::new(slot, datatype, nullable)),
    )
}

/// Create runtime state with the given batch size and layouts.
pub fn test_state(batch_size: usize, layouts: impl IntoIterator<Item = TupleLayout>) -> RuntimeState {
    let config = ExecutionConfig {
        batch_size,
        ..Default::default()
    };
    let descriptors = DescriptorTable::new(layouts).unwrap();
    RuntimeState::new(config, Arc::new(descriptors))
}

/// A single response from a scripted operator.
#[derive(Debug)]
pub enum ScriptStep {
    Rows(Vec<Vec<ScalarValue>>, PollPull),
    Error(DbError),
}

/// Counts calls made against a scripted operator.
///
/// Shared with the operator so counts can be inspected after the operator
/// has been moved into a parent.
#[derive(Debug, Clone, Default)]
pub struct CallCounts {
    opens: Arc<AtomicUsize>,
    pulls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl CallCounts {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Child operator returning a preset sequence of batches and errors.
///
/// Once the script runs out, every pull returns an empty exhausted batch.
#[derive(Debug)]
pub struct ScriptedOperator {
    layout: Arc<TupleLayout>,
    steps: VecDeque<ScriptStep>,
    open_error: Option<DbError>,
    counts: CallCounts,
}

impl ScriptedOperator {
    pub fn new(layout: TupleLayout, steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        ScriptedOperator {
            layout: Arc::new(layout),
            steps: steps.into_iter().collect(),
            open_error: None,
            counts: CallCounts::default(),
        }
    }

    pub fn with_open_error(mut self, error: DbError) -> Self {
        self.open_error = Some(error);
        self
    }

    pub fn counts(&self) -> CallCounts {
        self.counts.clone()
    }
}

impl PhysicalOperator for ScriptedOperator {
    fn operator_name(&self) -> &'static str {
        "Scripted"
    }

    fn output_layout(&self) -> &Arc<TupleLayout> {
        &self.layout
    }

    fn open(&mut self, _state: &RuntimeState) -> Result<()> {
        self.counts.opens.fetch_add(1, Ordering::SeqCst);
        match self.open_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn poll_pull(&mut self, _state: &RuntimeState, output: &mut RowBatch) -> Result<PollPull> {
        self.counts.pulls.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(ScriptStep::Rows(rows, poll)) => {
                for row in rows {
                    output.append_scalars(row)?;
                }
                Ok(poll)
            }
            Some(ScriptStep::Error(err)) => Err(err),
            None => Ok(PollPull::Exhausted),
        }
    }

    fn close(&mut self, _state: &RuntimeState) -> Result<()> {
        self.counts.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Explainable for ScriptedOperator {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Scripted")
    }
}

/// Pull from an operator until exhausted, collecting every batch as rows of
/// scalars.
pub fn collect_batches(
    op: &mut dyn PhysicalOperator,
    state: &RuntimeState,
) -> Result<Vec<Vec<Vec<ScalarValue>>>> {
    let mut out = state.new_batch(op.output_layout().clone());
    let mut batches = Vec::new();
    loop {
        let poll = op.poll_pull(state, &mut out)?;
        if !out.is_empty() {
            batches.push(out.to_scalar_rows()?);
        }
        out.reset_for_write();
        if poll == PollPull::Exhausted {
            return Ok(batches);
        }
    }
}
