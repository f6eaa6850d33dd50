use repeatexec_error::{DbError, Result};

/// Reference to a span of bytes in the heap region of an arena.
///
/// Stored inline in records for varlen values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRef {
    pub offset: u32,
    pub len: u32,
}

impl HeapRef {
    pub const ENCODED_WIDTH: usize = 8;

    pub fn encode(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.offset.to_le_bytes());
        buf[4..8].copy_from_slice(&self.len.to_le_bytes());
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut offset = [0; 4];
        let mut len = [0; 4];
        offset.copy_from_slice(&buf[0..4]);
        len.copy_from_slice(&buf[4..8]);
        HeapRef {
            offset: u32::from_le_bytes(offset),
            len: u32::from_le_bytes(len),
        }
    }
}

/// Fixed-stride bump allocator for encoded records.
///
/// Records are addressed by index. Record `i` occupies bytes `[i * stride,
/// (i + 1) * stride)` of the fixed region. Varlen data is appended to a
/// separate heap region owned by the same arena.
///
/// Nothing is freed individually, `reset` releases everything in bulk.
#[derive(Debug)]
pub struct RecordArena {
    /// Width in bytes of a single record.
    stride: usize,
    /// Number of records the fixed region was sized for.
    ///
    /// Zero until `allocate` is called.
    capacity: usize,
    /// Number of records handed out.
    len: usize,
    /// Fixed-size region, exactly `capacity * stride` bytes once allocated.
    fixed: Vec<u8>,
    /// Heap region for varlen values.
    heap: Vec<u8>,
    /// Length of the heap when the most recent record was pushed.
    ///
    /// Popping that record truncates the heap back to this mark.
    last_record_heap_start: usize,
    /// Optional limit on the total bytes (fixed + heap) this arena may hold.
    limit: Option<usize>,
}

impl RecordArena {
    pub const fn new(stride: usize, limit: Option<usize>) -> Self {
        RecordArena {
            stride,
            capacity: 0,
            len: 0,
            fixed: Vec::new(),
            heap: Vec::new(),
            last_record_heap_start: 0,
            limit,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn is_allocated(&self) -> bool {
        self.capacity > 0
    }

    /// Total bytes currently reserved by this arena.
    pub fn reserved_bytes(&self) -> usize {
        self.fixed.len() + self.heap.capacity()
    }

    /// Allocate the fixed region for `capacity` records.
    ///
    /// Must only be called on an arena that's not currently allocated.
    pub fn allocate(&mut self, capacity: usize) -> Result<()> {
        if self.is_allocated() {
            return Err(DbError::new("Record arena already allocated")
                .with_field("capacity", self.capacity));
        }

        let size = self.stride.checked_mul(capacity).ok_or_else(|| {
            DbError::allocation("Record arena size overflows")
                .with_field("stride", self.stride)
                .with_field("capacity", capacity)
        })?;
        self.check_limit(size)?;

        self.fixed.try_reserve_exact(size)?;
        // Fresh records are all zeroes, meaning all values are valid.
        self.fixed.resize(size, 0);
        self.capacity = capacity;

        Ok(())
    }

    /// Bump the cursor, returning the index of the next record.
    pub fn push_record(&mut self) -> Result<usize> {
        if self.len >= self.capacity {
            return Err(DbError::allocation("Record arena exhausted")
                .with_field("capacity", self.capacity));
        }
        let idx = self.len;
        self.len += 1;
        self.last_record_heap_start = self.heap.len();
        Ok(idx)
    }

    /// Remove the most recently pushed record.
    ///
    /// The bytes are zeroed so the slot can be reused, and heap data written
    /// since the record was pushed is discarded.
    pub fn pop_record(&mut self) {
        if self.len > 0 {
            self.len -= 1;
            let start = self.len * self.stride;
            self.fixed[start..start + self.stride].fill(0);
            self.heap.truncate(self.last_record_heap_start);
        }
    }

    /// Get the bytes for the record at `idx`.
    ///
    /// Panics if `idx` hasn't been handed out.
    pub fn record_at(&self, idx: usize) -> &[u8] {
        assert!(idx < self.len, "record {idx} out of bounds for len {}", self.len);
        let start = idx * self.stride;
        &self.fixed[start..start + self.stride]
    }

    pub fn record_at_mut(&mut self, idx: usize) -> &mut [u8] {
        assert!(idx < self.len, "record {idx} out of bounds for len {}", self.len);
        let start = idx * self.stride;
        &mut self.fixed[start..start + self.stride]
    }

    /// Copy bytes into the heap region.
    pub fn push_heap(&mut self, bytes: &[u8]) -> Result<HeapRef> {
        let offset = self.heap.len();
        let new_len = offset + bytes.len();
        let (offset, len) = match (u32::try_from(offset), u32::try_from(bytes.len())) {
            (Ok(offset), Ok(len)) if new_len <= u32::MAX as usize => (offset, len),
            _ => {
                return Err(DbError::allocation("Record arena heap exceeds max size")
                    .with_field("wanted", new_len));
            }
        };

        if new_len > self.heap.capacity() {
            // Double like a normal vec, but stay within the limit.
            let additional = usize::max(bytes.len(), self.heap.capacity());
            let additional = match self.limit {
                Some(limit) => {
                    let available = limit.saturating_sub(self.reserved_bytes());
                    if available < bytes.len() {
                        return Err(DbError::allocation("Record arena limit exceeded")
                            .with_field("wanted", bytes.len())
                            .with_field("available", available)
                            .with_field("limit", limit));
                    }
                    usize::min(additional, available)
                }
                None => additional,
            };
            self.heap.try_reserve_exact(additional)?;
        }

        self.heap.extend_from_slice(bytes);

        Ok(HeapRef { offset, len })
    }

    pub fn heap(&self) -> &[u8] {
        &self.heap
    }

    /// Release all records and heap data.
    pub fn reset(&mut self) {
        self.fixed = Vec::new();
        self.heap = Vec::new();
        self.capacity = 0;
        self.len = 0;
        self.last_record_heap_start = 0;
    }

    fn check_limit(&self, additional: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            let wanted = self.reserved_bytes().saturating_add(additional);
            if wanted > limit {
                return Err(DbError::allocation("Record arena limit exceeded")
                    .with_field("wanted", wanted)
                    .with_field("limit", limit));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use repeatexec_error::ErrorKind;

    use super::*;

    #[test]
    fn allocate_and_bump() {
        let mut arena = RecordArena::new(4, None);
        assert!(!arena.is_allocated());

        arena.allocate(3).unwrap();
        assert_eq!(12, arena.reserved_bytes());

        assert_eq!(0, arena.push_record().unwrap());
        assert_eq!(1, arena.push_record().unwrap());
        arena.record_at_mut(1).copy_from_slice(&[1, 2, 3, 4]);

        assert_eq!(&[0, 0, 0, 0], arena.record_at(0));
        assert_eq!(&[1, 2, 3, 4], arena.record_at(1));
        assert_eq!(2, arena.len());
    }

    #[test]
    fn push_past_capacity_errors() {
        let mut arena = RecordArena::new(4, None);
        arena.allocate(1).unwrap();
        arena.push_record().unwrap();

        let err = arena.push_record().unwrap_err();
        assert_eq!(ErrorKind::AllocationFailure, err.kind());
    }

    #[test]
    fn allocate_over_limit() {
        let mut arena = RecordArena::new(16, Some(100));
        let err = arena.allocate(8).unwrap_err();
        assert_eq!(ErrorKind::AllocationFailure, err.kind());
        assert!(!arena.is_allocated());
    }

    #[test]
    fn heap_over_limit() {
        let mut arena = RecordArena::new(8, Some(20));
        arena.allocate(2).unwrap();

        let r = arena.push_heap(b"abcd").unwrap();
        assert_eq!(HeapRef { offset: 0, len: 4 }, r);
        assert_eq!(b"abcd", arena.heap());

        let err = arena.push_heap(b"0123456789").unwrap_err();
        assert_eq!(ErrorKind::AllocationFailure, err.kind());
    }

    #[test]
    fn heap_ref_encoding() {
        let r = HeapRef { offset: 7, len: 300 };
        let mut buf = [0; 8];
        r.encode(&mut buf);
        assert_eq!(r, HeapRef::decode(&buf));
    }

    #[test]
    fn pop_zeroes_record() {
        let mut arena = RecordArena::new(2, None);
        arena.allocate(2).unwrap();
        let idx = arena.push_record().unwrap();
        arena.record_at_mut(idx).copy_from_slice(&[9, 9]);
        arena.pop_record();
        assert!(arena.is_empty());

        let idx = arena.push_record().unwrap();
        assert_eq!(&[0, 0], arena.record_at(idx));
    }

    #[test]
    fn pop_truncates_heap() {
        let mut arena = RecordArena::new(8, None);
        arena.allocate(2).unwrap();

        arena.push_record().unwrap();
        arena.push_heap(b"keep").unwrap();

        arena.push_record().unwrap();
        arena.push_heap(b"discard").unwrap();
        assert_eq!(11, arena.heap().len());

        arena.pop_record();
        assert_eq!(1, arena.len());
        assert_eq!(b"keep", arena.heap());

        // The next record's heap data starts where the popped one did.
        arena.push_record().unwrap();
        let r = arena.push_heap(b"xy").unwrap();
        assert_eq!(HeapRef { offset: 4, len: 2 }, r);
    }

    #[test]
    fn reset_releases() {
        let mut arena = RecordArena::new(2, None);
        arena.allocate(4).unwrap();
        arena.push_record().unwrap();
        arena.push_heap(b"hello").unwrap();

        arena.reset();
        assert!(!arena.is_allocated());
        assert_eq!(0, arena.reserved_bytes());
        arena.allocate(4).unwrap();
    }
}
