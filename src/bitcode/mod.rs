//! LSB-first bit stream codec
//!
//! [`BitEncoder`] appends into `u64` words; [`BitDecoder`] reads the same
//! stream back from bytes. Integers are written either with a fixed width or
//! as Exp-Golomb codes of a chosen order.

mod decoder;
mod encoder;

pub use decoder::BitDecoder;
pub use encoder::BitEncoder;

/// Bits per encoder word.
pub const WORD_BITS: u64 = 64;

/// Bits of a single peek that are always stream content.
pub const PEEK_BITS: u32 = 57;

#[inline]
pub(crate) fn low_mask(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Maps signed values onto unsigned ones, small magnitudes first.
#[inline]
pub fn zigzag_encode(value: i32) -> u64 {
    (((value as i64) << 1) ^ ((value as i64) >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i32 {
    ((value >> 1) as i64 ^ -((value & 1) as i64)) as i32
}
