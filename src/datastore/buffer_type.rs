//! Buffer types (size classes)
//!
//! A buffer type fixes the alignment every allocation is rounded up to, the
//! size of the first buffer it activates, the largest buffer the reference
//! layout can address, and the zeroed overread margin kept after each
//! allocation for word-at-a-time decoders.
//!
//! Buffers never grow. Each buffer a type activates to replace a full one
//! gets twice the capacity of its predecessor, up to the maximum.

use super::EntryRef;

/// Zero bytes appended after every allocation.
///
/// A decoder loading 8 bytes starting at the last payload byte reads at most
/// 7 bytes past the payload.
pub const DECODE_SAFETY: usize = 7;

/// Index of a buffer type inside a [`DataStore`](super::DataStore).
pub type TypeId = u32;

/// Size-class descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferType {
    alignment: usize,
    min_buffer_bytes: usize,
    max_buffer_bytes: usize,
    overread_margin: usize,
}

impl BufferType {
    /// Creates a buffer type.
    ///
    /// `max_buffer_bytes` is clamped to what an [`EntryRef`] offset can
    /// address at this alignment.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn new(alignment: usize, min_buffer_bytes: usize, max_buffer_bytes: usize) -> Self {
        assert!(
            alignment.is_power_of_two(),
            "alignment {} is not a power of two",
            alignment
        );
        let addressable = EntryRef::offset_size() * alignment;
        let max_buffer_bytes = max_buffer_bytes.min(addressable);
        Self {
            alignment,
            min_buffer_bytes: min_buffer_bytes.min(max_buffer_bytes),
            max_buffer_bytes,
            overread_margin: DECODE_SAFETY,
        }
    }

    /// Byte-granular type with 4-byte alignment spanning the full offset
    /// range, as used by the feature store.
    pub fn raw_bytes(min_buffer_bytes: usize) -> Self {
        Self::new(4, min_buffer_bytes, usize::MAX)
    }

    /// Overrides the overread margin.
    pub fn with_overread_margin(mut self, margin: usize) -> Self {
        self.overread_margin = margin;
        self
    }

    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    #[inline]
    pub fn min_buffer_bytes(&self) -> usize {
        self.min_buffer_bytes
    }

    #[inline]
    pub fn max_buffer_bytes(&self) -> usize {
        self.max_buffer_bytes
    }

    #[inline]
    pub fn overread_margin(&self) -> usize {
        self.overread_margin
    }

    /// Zero bytes needed to bring `byte_len` up to the alignment.
    #[inline]
    pub fn pad(&self, byte_len: usize) -> usize {
        byte_len.wrapping_neg() & (self.alignment - 1)
    }

    /// `byte_len` rounded up to the alignment.
    #[inline]
    pub fn align(&self, byte_len: usize) -> usize {
        byte_len + self.pad(byte_len)
    }

    /// Byte offset expressed in alignment units.
    #[inline]
    pub fn to_units(&self, byte_offset: usize) -> usize {
        byte_offset / self.alignment
    }

    /// Alignment units expressed as a byte offset.
    #[inline]
    pub fn to_bytes(&self, units: usize) -> usize {
        units * self.alignment
    }

    /// Capacity of a buffer replacing one of capacity `previous` (0 if
    /// none) that must fit at least `needed` bytes.
    pub fn next_buffer_bytes(&self, previous: usize, needed: usize) -> usize {
        previous
            .saturating_mul(2)
            .max(self.min_buffer_bytes)
            .max(needed)
            .min(self.max_buffer_bytes)
    }

    /// Largest single allocation any buffer of this type can hold.
    ///
    /// One alignment unit is kept back for the reserved head of buffer 0.
    #[inline]
    pub fn max_allocation(&self) -> usize {
        self.max_buffer_bytes.saturating_sub(self.alignment)
    }
}
