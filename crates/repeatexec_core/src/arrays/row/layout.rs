use std::collections::HashMap;
use std::fmt;

use repeatexec_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use crate::arrays::bitmap::num_bytes_for_bitmap;
use crate::arrays::datatype::DataType;

/// Identifier for a slot, unique within a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl SlotId {
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier for a tuple layout in a descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TupleId(pub u32);

impl fmt::Display for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Describes a single slot in a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub id: SlotId,
    pub datatype: DataType,
    pub nullable: bool,
}

impl SlotDescriptor {
    pub const fn new(id: u32, datatype: DataType, nullable: bool) -> Self {
        SlotDescriptor {
            id: SlotId(id),
            datatype,
            nullable,
        }
    }
}

/// Describes the byte layout of an encoded record.
///
/// A record begins with a null bitmap (one bit per slot, set means null),
/// followed by each slot's inline value at a fixed offset. Values are not
/// aligned and are always read and written with byte copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleLayout {
    pub(crate) id: TupleId,
    pub(crate) slots: Vec<SlotDescriptor>,
    /// Byte offsets within the encoded record to the start of each value.
    pub(crate) offsets: Vec<usize>,
    /// Size in bytes of the null bitmap.
    pub(crate) null_width: usize,
    /// Size in bytes of a complete record.
    pub(crate) record_width: usize,
}

impl TupleLayout {
    pub fn new(id: u32, slots: impl IntoIterator<Item = SlotDescriptor>) -> Self {
        let slots: Vec<_> = slots.into_iter().collect();
        let null_width = num_bytes_for_bitmap(slots.len());

        let mut offset = null_width;
        let mut offsets = Vec::with_capacity(slots.len());
        for slot in &slots {
            offsets.push(offset);
            offset += slot.datatype.inline_width();
        }

        TupleLayout {
            id: TupleId(id),
            slots,
            offsets,
            null_width,
            record_width: offset,
        }
    }

    pub const fn id(&self) -> TupleId {
        self.id
    }

    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub const fn null_width(&self) -> usize {
        self.null_width
    }

    pub const fn record_width(&self) -> usize {
        self.record_width
    }

    /// Byte range within a record holding the inline value for the slot at
    /// `idx`.
    pub fn value_range(&self, idx: usize) -> std::ops::Range<usize> {
        let start = self.offsets[idx];
        start..(start + self.slots[idx].datatype.inline_width())
    }

    pub fn datatypes(&self) -> impl ExactSizeIterator<Item = DataType> + '_ {
        self.slots.iter().map(|s| s.datatype)
    }

    /// Find the position of a slot by its id.
    pub fn position_of(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }
}

/// Resolves tuple ids to layouts.
///
/// Populated once when a query is planned and read-only afterwards.
#[derive(Debug, Default)]
pub struct DescriptorTable {
    layouts: HashMap<TupleId, TupleLayout>,
}

impl DescriptorTable {
    pub fn new(layouts: impl IntoIterator<Item = TupleLayout>) -> Result<Self> {
        let mut table = DescriptorTable::default();
        for layout in layouts {
            table.insert(layout)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, layout: TupleLayout) -> Result<()> {
        let id = layout.id;
        if self.layouts.insert(id, layout).is_some() {
            return Err(DbError::new("Duplicate tuple layout").with_field("tuple_id", id));
        }
        Ok(())
    }

    pub fn get_tuple_layout(&self, id: TupleId) -> Option<&TupleLayout> {
        self.layouts.get(&id)
    }
}
