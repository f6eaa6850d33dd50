use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use repeatexec_error::{DbError, Result};

use crate::arrays::row::batch::RowBatch;
use crate::arrays::row::layout::{DescriptorTable, TupleLayout};
use crate::config::execution::ExecutionConfig;

/// Shared signal for cooperatively canceling a query.
///
/// Cloned into every operator driving a query. Setting it from any thread is
/// observed by operators the next time they check.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Return a cancellation error if the query has been canceled.
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            return Err(DbError::cancelled());
        }
        Ok(())
    }
}

/// State supplied by the executor to every operator call.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub config: ExecutionConfig,
    pub cancellation: CancellationToken,
    pub descriptors: Arc<DescriptorTable>,
}

impl RuntimeState {
    pub fn new(config: ExecutionConfig, descriptors: Arc<DescriptorTable>) -> Self {
        RuntimeState {
            config,
            cancellation: CancellationToken::new(),
            descriptors,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Create an empty batch sized and limited according to the config.
    pub fn new_batch(&self, layout: Arc<TupleLayout>) -> RowBatch {
        RowBatch::with_arena_limit(layout, self.config.batch_size, self.config.arena_limit)
    }
}
