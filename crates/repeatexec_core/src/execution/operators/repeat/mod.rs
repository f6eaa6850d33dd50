//! Row expansion for GROUPING SETS, ROLLUP and CUBE.
//!
//! Each batch pulled from the child is replayed once per grouping
//! combination. Every replay produces one output batch in which grouping
//! slots outside the combination's keep set are null, and grouping indicator
//! slots hold the combination's indicator values.

pub mod plan;
pub mod writer;

use std::sync::Arc;

use repeatexec_error::{DbError, OptionExt, Result};
use tracing::{debug, trace};

use self::plan::{GroupingPlan, RepeatNodeDescriptor};
use self::writer::TupleWriter;
use super::{PhysicalOperator, PollPull};
use crate::arrays::row::batch::RowBatch;
use crate::arrays::row::layout::TupleLayout;
use crate::explain::explainable::{CompactList, ExplainConfig, ExplainEntry, Explainable};
use crate::expr::PhysicalScalarExpression;
use crate::runtime::state::RuntimeState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepeatStats {
    pub child_batches: usize,
    pub output_batches: usize,
    pub rows_produced: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Opened,
    Closed,
}

#[derive(Debug)]
struct RepeatState {
    lifecycle: Lifecycle,
    /// Batch pulled from the child, reused across pulls.
    input: Option<RowBatch>,
    /// If the input batch holds rows still being replayed.
    buffered: bool,
    /// Combination to produce on the next pull.
    combination_idx: usize,
    /// If the child has signaled it has no more rows.
    child_exhausted: bool,
    stats: RepeatStats,
}

#[derive(Debug)]
pub struct PhysicalRepeat {
    plan: GroupingPlan,
    exprs: Vec<PhysicalScalarExpression>,
    child: Box<dyn PhysicalOperator>,
    state: RepeatState,
}

impl PhysicalRepeat {
    /// Create a new repeat operator.
    ///
    /// `exprs` produce the value slots of the output layout, in order. The
    /// output layout is resolved through the runtime's descriptor table.
    pub fn try_new(
        runtime: &RuntimeState,
        descriptor: RepeatNodeDescriptor,
        exprs: Vec<PhysicalScalarExpression>,
        child: Box<dyn PhysicalOperator>,
    ) -> Result<Self> {
        let plan = GroupingPlan::try_new(descriptor, &runtime.descriptors, &exprs)?;

        debug!(
            combinations = plan.num_combinations(),
            value_slots = plan.num_value_slots(),
            output_tuple = %plan.output_layout().id(),
            "created repeat operator"
        );

        Ok(PhysicalRepeat {
            plan,
            exprs,
            child,
            state: RepeatState {
                lifecycle: Lifecycle::Created,
                input: None,
                buffered: false,
                combination_idx: 0,
                child_exhausted: false,
                stats: RepeatStats::default(),
            },
        })
    }

    pub fn plan(&self) -> &GroupingPlan {
        &self.plan
    }

    pub fn stats(&self) -> RepeatStats {
        self.state.stats
    }

    /// Pull the next batch from the child into the input buffer.
    ///
    /// Returns false if there's nothing to replay.
    fn refill(&mut self, runtime: &RuntimeState) -> Result<bool> {
        if self.state.child_exhausted {
            return Ok(false);
        }

        let input = self
            .state
            .input
            .get_or_insert_with(|| runtime.new_batch(self.child.output_layout().clone()));
        input.reset_for_write();

        let poll = self.child.poll_pull(runtime, input)?;
        self.state.stats.child_batches += 1;
        if poll == PollPull::Exhausted {
            self.state.child_exhausted = true;
        }

        trace!(rows = input.num_rows(), ?poll, "pulled batch from child");

        // An empty batch ends the stream, even if the child reports it has
        // more. The child is not pulled again.
        if input.is_empty() {
            if poll == PollPull::HasMore {
                debug!("child produced an empty batch, ending repeat output");
            }
            self.state.child_exhausted = true;
            return Ok(false);
        }

        self.state.buffered = true;
        self.state.combination_idx = 0;
        Ok(true)
    }
}

impl PhysicalOperator for PhysicalRepeat {
    fn operator_name(&self) -> &'static str {
        "Repeat"
    }

    fn output_layout(&self) -> &Arc<TupleLayout> {
        self.plan.output_layout()
    }

    fn open(&mut self, state: &RuntimeState) -> Result<()> {
        match self.state.lifecycle {
            Lifecycle::Created => (),
            Lifecycle::Opened => return Err(DbError::new("Repeat operator already opened")),
            Lifecycle::Closed => return Err(DbError::new("Cannot open a closed repeat operator")),
        }

        let input_layout = self.child.output_layout().clone();
        for expr in &mut self.exprs {
            expr.open(&input_layout)?;
        }

        state.cancellation.check()?;
        self.child.open(state)?;

        self.state.lifecycle = Lifecycle::Opened;
        Ok(())
    }

    fn poll_pull(&mut self, state: &RuntimeState, output: &mut RowBatch) -> Result<PollPull> {
        state.cancellation.check()?;

        match self.state.lifecycle {
            Lifecycle::Opened => (),
            Lifecycle::Created => {
                return Err(DbError::new("Repeat operator polled before open"));
            }
            Lifecycle::Closed => {
                return Err(DbError::new("Repeat operator polled after close"));
            }
        }
        if !output.is_empty() {
            return Err(DbError::new("Repeat output batch must be empty")
                .with_field("num_rows", output.num_rows()));
        }

        if !self.state.buffered && !self.refill(state)? {
            return Ok(PollPull::Exhausted);
        }

        let input = self
            .state
            .input
            .as_ref()
            .required("buffered input batch")?;
        let combination = self.state.combination_idx;

        let writer = TupleWriter::new(&self.plan, &self.exprs);
        if let Err(err) = writer.write_combination(input, combination, output) {
            output.reset_for_write();
            return Err(err);
        }

        self.state.stats.output_batches += 1;
        self.state.stats.rows_produced += output.num_rows();

        trace!(combination, rows = output.num_rows(), "wrote repeat combination");

        self.state.combination_idx += 1;
        if self.state.combination_idx == self.plan.num_combinations() {
            self.state.combination_idx = 0;
            self.state.buffered = false;
            if let Some(input) = &mut self.state.input {
                input.reset_for_write();
            }
        }

        Ok(PollPull::HasMore)
    }

    fn close(&mut self, state: &RuntimeState) -> Result<()> {
        if self.state.lifecycle == Lifecycle::Closed {
            return Ok(());
        }
        self.state.lifecycle = Lifecycle::Closed;

        self.state.input = None;
        self.state.buffered = false;

        for expr in &mut self.exprs {
            expr.close();
        }

        let stats = self.state.stats;
        debug!(
            child_batches = stats.child_batches,
            output_batches = stats.output_batches,
            rows_produced = stats.rows_produced,
            "closing repeat operator"
        );

        self.child.close(state)
    }
}

impl Explainable for PhysicalRepeat {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let desc = self.plan.descriptor();
        let mut ent = ExplainEntry::new("Repeat")
            .with_value("repeat_ids", CompactList(desc.repeat_ids.as_slice()))
            .with_values(
                "grouping_list",
                desc.grouping_list.iter().map(|c| CompactList(c.as_slice())),
            );

        if conf.verbose {
            let keep_sets = desc.keep_sets.iter().map(|set| {
                let ids: Vec<_> = set.iter().copied().collect();
                CompactList(ids.as_slice()).to_string()
            });
            let grouping: Vec<_> = desc.grouping_slots.iter().copied().collect();
            ent = ent
                .with_value("grouping_slots", CompactList(grouping.as_slice()))
                .with_values("keep_sets", keep_sets)
                .with_value("output_tuple", desc.output_tuple_id)
                .with_values("exprs", &self.exprs);
        }

        ent
    }
}
