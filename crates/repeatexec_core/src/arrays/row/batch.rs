use std::fmt;
use std::sync::Arc;

use repeatexec_error::{DbError, Result};

use super::encoding::{read_value, varlen_bytes, write_fixed, write_integer};
use super::layout::TupleLayout;
use crate::arrays::bitmap::{get_bit, set_bit};
use crate::arrays::scalar::{BorrowedScalarValue, ScalarValue};
use crate::buffer::arena::RecordArena;

/// A bounded batch of encoded records sharing a single layout.
///
/// Records are stored in an arena owned by the batch. The arena's fixed region
/// is allocated lazily when the first record is appended, sized to hold
/// `capacity` records.
pub struct RowBatch {
    layout: Arc<TupleLayout>,
    capacity: usize,
    arena: RecordArena,
}

impl RowBatch {
    /// Create a new batch with no limit on arena memory.
    pub fn new(layout: Arc<TupleLayout>, capacity: usize) -> Self {
        Self::with_arena_limit(layout, capacity, None)
    }

    pub fn with_arena_limit(
        layout: Arc<TupleLayout>,
        capacity: usize,
        limit: Option<usize>,
    ) -> Self {
        let arena = RecordArena::new(layout.record_width(), limit);
        RowBatch {
            layout,
            capacity,
            arena,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of committed rows in the batch.
    pub const fn num_rows(&self) -> usize {
        self.arena.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub const fn is_full(&self) -> bool {
        self.arena.len() >= self.capacity
    }

    pub fn arena(&self) -> &RecordArena {
        &self.arena
    }

    /// Drop all rows and release arena memory.
    pub fn reset_for_write(&mut self) {
        self.arena.reset();
    }

    /// Begin writing a new record at the end of the batch.
    ///
    /// The record starts out with all slots non-null and zeroed. The record is
    /// only kept if `RecordWriter::commit` is called, dropping the writer
    /// discards it.
    pub fn append_record(&mut self) -> Result<RecordWriter<'_>> {
        if self.is_full() {
            return Err(DbError::new("Row batch is full").with_field("capacity", self.capacity));
        }
        if !self.arena.is_allocated() {
            self.arena.allocate(self.capacity)?;
        }

        let idx = self.arena.push_record()?;

        Ok(RecordWriter {
            layout: self.layout.as_ref(),
            arena: &mut self.arena,
            idx,
            committed: false,
        })
    }

    /// Append a row of scalar values, one per slot.
    pub fn append_scalars<'a>(
        &mut self,
        values: impl IntoIterator<Item = BorrowedScalarValue<'a>>,
    ) -> Result<()> {
        let mut writer = self.append_record()?;
        let mut count = 0;
        for (idx, value) in values.into_iter().enumerate() {
            if idx >= writer.layout.num_slots() {
                return Err(DbError::new("Too many values for row")
                    .with_field("num_slots", writer.layout.num_slots()));
            }
            writer.write_value(idx, &value)?;
            count += 1;
        }
        if count != writer.layout.num_slots() {
            return Err(DbError::new("Not enough values for row")
                .with_field("num_slots", writer.layout.num_slots())
                .with_field("num_values", count));
        }
        writer.commit();
        Ok(())
    }

    /// Get a reference to the row at `idx`.
    ///
    /// Panics if out of bounds.
    pub fn row(&self, idx: usize) -> RowRef<'_> {
        RowRef {
            layout: self.layout.as_ref(),
            record: self.arena.record_at(idx),
            heap: self.arena.heap(),
        }
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = RowRef<'_>> + '_ {
        (0..self.num_rows()).map(|idx| self.row(idx))
    }

    /// Decode every row into owned scalars.
    pub fn to_scalar_rows(&self) -> Result<Vec<Vec<ScalarValue>>> {
        self.rows().map(|row| row.to_scalars()).collect()
    }
}

impl fmt::Debug for RowBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowBatch")
            .field("tuple_id", &self.layout.id())
            .field("capacity", &self.capacity)
            .field("num_rows", &self.num_rows())
            .finish_non_exhaustive()
    }
}

/// A read-only view of a single encoded record.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    layout: &'a TupleLayout,
    record: &'a [u8],
    heap: &'a [u8],
}

impl<'a> RowRef<'a> {
    pub fn layout(&self) -> &'a TupleLayout {
        self.layout
    }

    pub fn num_slots(&self) -> usize {
        self.layout.num_slots()
    }

    pub fn is_null(&self, idx: usize) -> bool {
        get_bit(&self.record[..self.layout.null_width()], idx)
    }

    /// Read the value for the slot at `idx`, returning Null if the slot is
    /// null.
    pub fn value(&self, idx: usize) -> Result<BorrowedScalarValue<'a>> {
        if idx >= self.layout.num_slots() {
            return Err(DbError::new("Slot index out of bounds")
                .with_field("idx", idx)
                .with_field("num_slots", self.layout.num_slots()));
        }
        if self.is_null(idx) {
            return Ok(BorrowedScalarValue::Null);
        }
        let datatype = self.layout.slots()[idx].datatype;
        read_value(&self.record[self.layout.value_range(idx)], self.heap, datatype)
    }

    pub fn to_scalars(&self) -> Result<Vec<ScalarValue>> {
        (0..self.num_slots())
            .map(|idx| self.value(idx).map(|v| v.into_owned()))
            .collect()
    }
}

/// Writes values for a single record that's been appended to a batch.
#[derive(Debug)]
pub struct RecordWriter<'a> {
    layout: &'a TupleLayout,
    arena: &'a mut RecordArena,
    idx: usize,
    committed: bool,
}

impl RecordWriter<'_> {
    /// Zero the null bitmap, marking every slot as non-null.
    pub fn clear_nulls(&mut self) {
        let null_width = self.layout.null_width();
        self.arena.record_at_mut(self.idx)[..null_width].fill(0);
    }

    pub fn set_null(&mut self, idx: usize) {
        let null_width = self.layout.null_width();
        set_bit(&mut self.arena.record_at_mut(self.idx)[..null_width], idx, true);
    }

    pub fn set_not_null(&mut self, idx: usize) {
        let null_width = self.layout.null_width();
        set_bit(&mut self.arena.record_at_mut(self.idx)[..null_width], idx, false);
    }

    /// Write a value to the slot at `idx`, copying varlen data into the arena
    /// heap.
    ///
    /// A Null value marks the slot null, and errors if the slot isn't
    /// nullable.
    pub fn write_value(&mut self, idx: usize, value: &BorrowedScalarValue) -> Result<()> {
        let layout = self.layout;
        let slot = &layout.slots()[idx];

        if value.is_null() {
            if !slot.nullable {
                return Err(DbError::new("Null value for non-nullable slot")
                    .with_field("slot", slot.id));
            }
            self.set_null(idx);
            return Ok(());
        }

        self.set_not_null(idx);
        let range = layout.value_range(idx);

        if slot.datatype.is_varlen() {
            let bytes = varlen_bytes(slot.datatype, value)?;
            let heap_ref = self.arena.push_heap(bytes)?;
            heap_ref.encode(&mut self.arena.record_at_mut(self.idx)[range]);
        } else {
            write_fixed(
                &mut self.arena.record_at_mut(self.idx)[range],
                slot.datatype,
                value,
            )?;
        }

        Ok(())
    }

    /// Write an integer to an integer slot, marking it non-null.
    pub fn write_integer(&mut self, idx: usize, value: i64) -> Result<()> {
        self.set_not_null(idx);
        let datatype = self.layout.slots()[idx].datatype;
        let range = self.layout.value_range(idx);
        write_integer(&mut self.arena.record_at_mut(self.idx)[range], datatype, value)
    }

    /// Keep the record as the next row of the batch.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for RecordWriter<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.arena.pop_record();
        }
    }
}
