//! EntryRef - compact handle to an allocated byte range
//!
//! Layout of the 32-bit value:
//!
//! ```text
//! 31            22 21                          0
//! +---------------+----------------------------+
//! |  buffer id    |  offset (alignment units)  |
//! +---------------+----------------------------+
//! ```
//!
//! The raw value 0 is the invalid reference. Buffer 0 never hands out its
//! first alignment unit, so no allocation can produce it.

use std::fmt;

/// Number of bits holding the offset.
pub const OFFSET_BITS: u32 = 22;

/// Number of bits holding the buffer id.
pub const BUFFER_BITS: u32 = 32 - OFFSET_BITS;

/// Number of buffer ids a store can hand out.
pub const NUM_BUFFERS: u32 = 1 << BUFFER_BITS;

const OFFSET_MASK: u32 = (1 << OFFSET_BITS) - 1;

/// Index of a buffer inside a [`DataStore`](super::DataStore).
pub type BufferId = u32;

/// Opaque `{buffer id, offset}` handle.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct EntryRef(u32);

impl EntryRef {
    /// Packs a buffer id and an offset counted in alignment units.
    ///
    /// # Panics
    ///
    /// Panics if either part does not fit its bit field.
    #[inline]
    pub fn new(buffer_id: BufferId, offset: u32) -> Self {
        assert!(buffer_id < NUM_BUFFERS, "buffer id {} out of range", buffer_id);
        assert!(offset <= OFFSET_MASK, "offset {} out of range", offset);
        Self((buffer_id << OFFSET_BITS) | offset)
    }

    /// Reconstructs a reference from its raw value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw packed value.
    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Returns false for the invalid reference.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn buffer_id(&self) -> BufferId {
        self.0 >> OFFSET_BITS
    }

    /// Offset in alignment units of the owning buffer's type.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.0 & OFFSET_MASK
    }

    /// Number of distinct offsets a reference can express.
    #[inline]
    pub const fn offset_size() -> usize {
        1 << OFFSET_BITS
    }
}

impl fmt::Debug for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryRef({}:{})", self.buffer_id(), self.offset())
    }
}
