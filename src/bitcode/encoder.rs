//! Word-oriented bit stream writer
//!
//! Bits are written least-significant first into a growable vector of `u64`
//! words, so the byte image of the words in little-endian order is the byte
//! image a [`BitDecoder`](super::BitDecoder) reads.

use super::{low_mask, WORD_BITS};

/// Reusable bit stream writer.
#[derive(Debug, Default, Clone)]
pub struct BitEncoder {
    words: Vec<u64>,
    offset: u64,
}

impl BitEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with room for `words` words before it reallocates.
    pub fn with_capacity_words(words: usize) -> Self {
        Self {
            words: Vec::with_capacity(words),
            offset: 0,
        }
    }

    /// Current write offset in bits.
    #[inline]
    pub fn write_offset(&self) -> u64 {
        self.offset
    }

    /// Rewinds to offset 0, keeping the allocated words.
    pub fn reset(&mut self) {
        self.words.clear();
        self.offset = 0;
    }

    /// Appends the low `n` bits of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `n > 64`.
    #[inline]
    pub fn write_bits(&mut self, value: u64, n: u32) {
        assert!(n <= WORD_BITS as u32, "cannot write {} bits at once", n);
        if n == 0 {
            return;
        }
        let value = value & low_mask(n);
        let word = (self.offset / WORD_BITS) as usize;
        let bit = (self.offset % WORD_BITS) as u32;
        if self.words.len() < word + 2 {
            self.words.resize(word + 2, 0);
        }
        self.words[word] |= value << bit;
        if bit + n > WORD_BITS as u32 {
            self.words[word + 1] |= value >> (WORD_BITS as u32 - bit);
        }
        self.offset += n as u64;
    }

    /// Appends a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(bit as u64, 1);
    }

    /// Appends `value` as an order-`k` Exp-Golomb code.
    ///
    /// `z` zero bits, a one bit, then the `z + k` low bits of
    /// `value + 2^k`, where `z + k + 1` is the bit width of `value + 2^k`.
    pub fn write_exp_golomb(&mut self, value: u64, k: u32) {
        let x = value
            .checked_add(1u64 << k)
            .unwrap_or_else(|| panic!("value {} too large for order {} code", value, k));
        let width = WORD_BITS as u32 - x.leading_zeros();
        let zeros = width - 1 - k;
        self.write_bits(0, zeros);
        self.write_bit(true);
        self.write_bits(x, width - 1);
    }

    /// Pads with zero bits up to the next word boundary.
    pub fn align_to_word(&mut self) {
        let rem = self.offset % WORD_BITS;
        if rem != 0 {
            self.write_bits(0, (WORD_BITS - rem) as u32);
        }
    }

    /// Copies `dst.len()` bytes of the stream starting at word-aligned bit
    /// offset `begin`.
    ///
    /// # Panics
    ///
    /// Panics if `begin` is not word aligned or the window extends past the
    /// written words.
    pub fn copy_bytes(&self, begin: u64, dst: &mut [u8]) {
        assert_eq!(begin % WORD_BITS, 0, "window start {} is not word aligned", begin);
        let first_word = (begin / WORD_BITS) as usize;
        let word_len = (dst.len() + 7) / 8;
        let words = &self.words[first_word..first_word + word_len];
        for (chunk, word) in dst.chunks_mut(8).zip(words) {
            let bytes = word.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    /// Byte image of everything written so far, rounded up to whole bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let byte_len = ((self.offset + 7) / 8) as usize;
        let mut out = vec![0u8; byte_len];
        self.copy_bytes(0, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits_lsb_first() {
        let mut enc = BitEncoder::new();
        enc.write_bits(0b101, 3);
        enc.write_bits(0b11, 2);
        assert_eq!(enc.write_offset(), 5);
        assert_eq!(enc.to_bytes(), vec![0b11101]);
    }

    #[test]
    fn test_write_bits_across_word_boundary() {
        let mut enc = BitEncoder::new();
        enc.write_bits(0, 60);
        enc.write_bits(0xff, 8);
        assert_eq!(enc.words[0], 0xf << 60);
        assert_eq!(enc.words[1], 0xf);
    }

    #[test]
    fn test_write_full_word() {
        let mut enc = BitEncoder::new();
        enc.write_bits(u64::MAX, 64);
        enc.write_bits(1, 1);
        assert_eq!(enc.words[0], u64::MAX);
        assert_eq!(enc.words[1], 1);
        assert_eq!(enc.write_offset(), 65);
    }

    #[test]
    fn test_value_masked_to_width() {
        let mut enc = BitEncoder::new();
        enc.write_bits(0xff, 4);
        enc.write_bits(0, 4);
        assert_eq!(enc.to_bytes(), vec![0x0f]);
    }

    #[test]
    fn test_exp_golomb_order0_lengths() {
        // 0 -> "1", 1 -> "010", 2 -> "011", 3 -> "00100"
        for (value, bits) in [(0u64, 1u64), (1, 3), (2, 3), (3, 5), (6, 5), (7, 7)] {
            let mut enc = BitEncoder::new();
            enc.write_exp_golomb(value, 0);
            assert_eq!(enc.write_offset(), bits, "value {}", value);
        }
    }

    #[test]
    fn test_exp_golomb_higher_order_lengths() {
        let mut enc = BitEncoder::new();
        enc.write_exp_golomb(0, 3);
        assert_eq!(enc.write_offset(), 4);

        enc.reset();
        enc.write_exp_golomb(8, 3);
        assert_eq!(enc.write_offset(), 6);
    }

    #[test]
    fn test_align_to_word() {
        let mut enc = BitEncoder::new();
        enc.write_bits(1, 3);
        enc.align_to_word();
        assert_eq!(enc.write_offset(), 64);
        enc.align_to_word();
        assert_eq!(enc.write_offset(), 64);
    }

    #[test]
    fn test_copy_bytes_window() {
        let mut enc = BitEncoder::new();
        enc.write_bits(0xdead_beef, 32);
        enc.align_to_word();
        enc.write_bits(0x1234, 16);

        let mut dst = [0u8; 2];
        enc.copy_bytes(64, &mut dst);
        assert_eq!(dst, [0x34, 0x12]);
    }

    #[test]
    fn test_reset_clears_words() {
        let mut enc = BitEncoder::new();
        enc.write_bits(u64::MAX, 64);
        enc.reset();
        enc.write_bits(0, 8);
        assert_eq!(enc.to_bytes(), vec![0]);
    }

    #[test]
    #[should_panic(expected = "not word aligned")]
    fn test_copy_bytes_unaligned_panics() {
        let mut enc = BitEncoder::new();
        enc.write_bits(0, 64);
        let mut dst = [0u8; 1];
        enc.copy_bytes(8, &mut dst);
    }
}
