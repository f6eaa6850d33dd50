use std::fmt;

/// Compute the number of bytes needed to hold a bitmap with `num_bits` bits.
pub const fn num_bytes_for_bitmap(num_bits: usize) -> usize {
    num_bits.div_ceil(8)
}

/// Get the bit at `idx` in an LSB ordered byte slice.
#[inline]
pub fn get_bit(bytes: &[u8], idx: usize) -> bool {
    let byte = bytes[idx >> 3]; // Equivalent to idx / 8
    (byte >> (idx & 7)) & 1 != 0 // `idx & 7` equivalent to `idx % 8`
}

/// Set the bit at `idx` in an LSB ordered byte slice.
#[inline]
pub fn set_bit(bytes: &mut [u8], idx: usize, val: bool) {
    if val {
        bytes[idx >> 3] |= 1 << (idx & 7);
    } else {
        bytes[idx >> 3] &= !(1 << (idx & 7));
    }
}

/// An LSB ordered bitmap.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    len: usize,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn new_with_all_false(len: usize) -> Self {
        Bitmap {
            len,
            data: vec![0; num_bytes_for_bitmap(len)],
        }
    }

    /// Create a bitmap of the given length with only the provided indices set.
    ///
    /// Panics if any index is out of bounds.
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bitmap = Self::new_with_all_false(len);
        for idx in indices {
            bitmap.set(idx, true);
        }
        bitmap
    }

    /// Get the number of bits being tracked by this bitmap.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the value at index.
    ///
    /// Panics if index is out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> bool {
        assert!(idx < self.len, "index {idx} out of bounds for len {}", self.len);
        get_bit(&self.data, idx)
    }

    /// Get the value at index, returning false if out of bounds.
    #[inline]
    pub fn value_or_false(&self, idx: usize) -> bool {
        idx < self.len && get_bit(&self.data, idx)
    }

    /// Set a bit at index.
    ///
    /// Panics if index is out of bounds.
    #[inline]
    pub fn set(&mut self, idx: usize, val: bool) {
        assert!(idx < self.len, "index {idx} out of bounds for len {}", self.len);
        set_bit(&mut self.data, idx, val)
    }

    /// Iterate over the indices of all set bits in ascending order.
    pub fn index_iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&idx| get_bit(&self.data, idx))
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..self.len).map(|idx| get_bit(&self.data, idx)))
            .finish()
    }
}
