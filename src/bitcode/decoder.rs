//! Bit stream reader over a byte slice
//!
//! Reads are done a word at a time: `peek` loads the eight bytes covering the
//! read offset and shifts out the already-consumed bits of the first byte.
//! Ranges handed out by the arena are followed by a zeroed overread margin.
//! A slice that ends sooner, such as a reader's view of a buffer that is
//! still being filled, reads as zero bits past its end.

use super::{low_mask, PEEK_BITS};

/// Cursor over an LSB-first bit stream.
#[derive(Debug, Clone)]
pub struct BitDecoder<'a> {
    bytes: &'a [u8],
    offset: u64,
}

impl<'a> BitDecoder<'a> {
    /// Starts reading at the first bit of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bits consumed so far.
    #[inline]
    pub fn read_offset(&self) -> u64 {
        self.offset
    }

    /// Up to 64 bits starting at the read offset, without consuming them.
    ///
    /// Only the low [`PEEK_BITS`] bits are guaranteed to be stream content.
    ///
    /// # Panics
    ///
    /// Panics if the read offset is already past the end of the slice.
    #[inline]
    pub fn peek(&self) -> u64 {
        let start = (self.offset / 8) as usize;
        let shift = (self.offset % 8) as u32;
        let word = match self.bytes.get(start..start + 8) {
            Some(window) => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(window);
                u64::from_le_bytes(buf)
            }
            None => {
                assert!(
                    start < self.bytes.len(),
                    "bit stream read past end at bit {} of {}",
                    self.offset,
                    self.bytes.len() * 8
                );
                let mut buf = [0u8; 8];
                let tail = &self.bytes[start..];
                buf[..tail.len()].copy_from_slice(tail);
                u64::from_le_bytes(buf)
            }
        };
        word >> shift
    }

    /// Consumes `n` bits without looking at them.
    #[inline]
    pub fn skip_bits(&mut self, n: u64) {
        self.offset += n;
    }

    /// Reads `n <= 64` bits.
    pub fn read_bits(&mut self, n: u32) -> u64 {
        assert!(n <= 64, "cannot read {} bits at once", n);
        if n == 0 {
            return 0;
        }
        if n <= PEEK_BITS {
            let value = self.peek() & low_mask(n);
            self.offset += n as u64;
            return value;
        }
        let low = self.read_bits(32);
        let high = self.read_bits(n - 32);
        low | (high << 32)
    }

    #[inline]
    pub fn read_bit(&mut self) -> bool {
        self.read_bits(1) == 1
    }

    /// Reads one order-`k` Exp-Golomb code.
    pub fn read_exp_golomb(&mut self, k: u32) -> u64 {
        let mut zeros = 0u32;
        loop {
            let window = self.peek() & low_mask(PEEK_BITS);
            if window != 0 {
                let tz = window.trailing_zeros();
                zeros += tz;
                self.offset += tz as u64 + 1;
                break;
            }
            zeros += PEEK_BITS;
            self.offset += PEEK_BITS as u64;
        }
        assert!(
            zeros + k < 64,
            "exp-golomb prefix of {} zeros at bit {} is out of range",
            zeros,
            self.offset
        );
        let width = zeros + k;
        let x = (1u64 << width) | self.read_bits(width);
        x - (1u64 << k)
    }

    /// Skips one order-`k` Exp-Golomb code.
    pub fn skip_exp_golomb(&mut self, k: u32) {
        self.read_exp_golomb(k);
    }
}
