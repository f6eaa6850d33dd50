//! Physical operators.
//!
//! Operators are driven by a single thread through a three-call protocol:
//! `open`, repeated `poll_pull` calls until `Exhausted` is returned, then
//! `close`.

pub mod repeat;
pub mod values;

use std::fmt::Debug;
use std::sync::Arc;

use repeatexec_error::Result;

use crate::arrays::row::batch::RowBatch;
use crate::arrays::row::layout::TupleLayout;
use crate::explain::explainable::Explainable;
use crate::runtime::state::RuntimeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPull {
    /// Output batch has been written to, and more batches may follow.
    HasMore,
    /// The operator is done producing output.
    ///
    /// The output batch may still contain rows that must be consumed.
    Exhausted,
}

pub trait PhysicalOperator: Explainable + Debug + Send {
    /// Name used in logs and explain output.
    fn operator_name(&self) -> &'static str;

    /// Layout of the rows written by `poll_pull`.
    fn output_layout(&self) -> &Arc<TupleLayout>;

    /// Prepare the operator (and its children) for execution.
    fn open(&mut self, state: &RuntimeState) -> Result<()>;

    /// Write the next batch of rows to `output`.
    ///
    /// `output` must be empty and use this operator's output layout.
    fn poll_pull(&mut self, state: &RuntimeState, output: &mut RowBatch) -> Result<PollPull>;

    /// Release resources held by the operator and close its children.
    ///
    /// Calling close more than once has no effect.
    fn close(&mut self, state: &RuntimeState) -> Result<()>;
}
