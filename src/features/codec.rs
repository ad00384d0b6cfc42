//! Feature codec
//!
//! [`FeatureEncoder`] writes records into a reusable scratch bit stream, one
//! record per 64-bit aligned window. [`FeatureDecoder`] reads one record back
//! from an arena range.
//!
//! Record layout, all integers Exp-Golomb coded:
//!
//! ```text
//! [num_elements - 1]                      if the field has elements
//! per element:
//!   [element_id delta]                    if the field has elements
//!   [zigzag(weight)]                      if the field has weights
//!   element_len - 1                       order: log2(avg_elem_len)
//!   num_positions - 1
//!   position deltas                       order: log2(element_len / num_positions)
//! ```

use super::params::{lookup_field, position_order};
use super::{DocFeatures, ElementFeatures, FeatureStoreError, FeatureStoreResult, FieldParams};
use crate::bitcode::{zigzag_decode, zigzag_encode, BitDecoder, BitEncoder, WORD_BITS};
use crate::observability::{log_event_with_fields, Event, Logger};

/// Scratch encoder bound to one field at a time.
#[derive(Debug)]
pub struct FeatureEncoder {
    bits: BitEncoder,
    fields: Vec<FieldParams>,
    selected: Option<u32>,
    reset_threshold_bits: u64,
}

impl FeatureEncoder {
    pub fn new(fields: Vec<FieldParams>, reset_threshold_bits: u64) -> Self {
        let words = (reset_threshold_bits / WORD_BITS) as usize + 2;
        Self {
            bits: BitEncoder::with_capacity_words(words),
            fields,
            selected: None,
            reset_threshold_bits,
        }
    }

    /// Layout parameters of field `index`.
    pub fn field_params(&self, index: u32) -> FeatureStoreResult<&FieldParams> {
        lookup_field(&self.fields, index)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Binds the encoder to field `index`. Does not move the write offset.
    pub fn select_field(&mut self, index: u32) -> FeatureStoreResult<()> {
        self.field_params(index)?;
        self.selected = Some(index);
        Ok(())
    }

    pub fn selected_field(&self) -> Option<u32> {
        self.selected
    }

    /// Current scratch offset in bits, always a multiple of 64 between writes.
    pub fn write_offset(&self) -> u64 {
        self.bits.write_offset()
    }

    /// Rewinds the scratch to offset 0 if the write offset is past the
    /// threshold. Returns true if it did.
    pub fn reset_if_over_threshold(&mut self) -> bool {
        let offset = self.bits.write_offset();
        if offset <= self.reset_threshold_bits {
            return false;
        }
        self.bits.reset();
        if Logger::enabled(Event::ScratchReset.severity()) {
            let offset_field = offset.to_string();
            log_event_with_fields(Event::ScratchReset, &[("offset_bits", offset_field.as_str())]);
        }
        true
    }

    /// Appends `record` for the selected field and pads the scratch to the
    /// next word. Returns the bit window `(begin, end)` of the record itself.
    ///
    /// # Panics
    ///
    /// Panics if no field is selected or the write offset is not word
    /// aligned.
    pub fn write(&mut self, record: &DocFeatures) -> FeatureStoreResult<(u64, u64)> {
        let index = self
            .selected
            .unwrap_or_else(|| panic!("feature write without a selected field"));
        let params = self.fields[index as usize];
        record
            .validate(&params)
            .map_err(|reason| FeatureStoreError::InvalidRecord { index, reason })?;

        let begin = self.bits.write_offset();
        assert_eq!(begin % WORD_BITS, 0, "scratch offset {} is not word aligned", begin);
        encode_record(&mut self.bits, &params, record);
        let end = self.bits.write_offset();
        self.bits.align_to_word();
        Ok((begin, end))
    }

    /// Bit length of the window `[begin, end)`.
    ///
    /// # Panics
    ///
    /// Panics if the window is empty.
    pub fn seal(begin: u64, end: u64) -> u64 {
        assert!(end > begin, "sealed empty feature window [{}, {})", begin, end);
        end - begin
    }

    /// Copies `dst.len()` bytes of the window starting at `begin`.
    pub fn copy_window(&self, begin: u64, dst: &mut [u8]) {
        self.bits.copy_bytes(begin, dst);
    }
}

fn encode_record(bits: &mut BitEncoder, params: &FieldParams, record: &DocFeatures) {
    if params.has_elements {
        bits.write_exp_golomb(record.elements.len() as u64 - 1, 0);
    }
    let length_order = params.length_order();
    let mut prev_id: i64 = -1;
    for element in &record.elements {
        if params.has_elements {
            let id = element.element_id as i64;
            bits.write_exp_golomb((id - prev_id - 1) as u64, 0);
            prev_id = id;
        }
        if params.has_element_weights {
            bits.write_exp_golomb(zigzag_encode(element.weight), 0);
        }
        bits.write_exp_golomb(element.element_len as u64 - 1, length_order);
        bits.write_exp_golomb(element.positions.len() as u64 - 1, 0);

        let order = position_order(element.element_len, element.positions.len());
        let mut prev_pos: i64 = -1;
        for &pos in &element.positions {
            let pos = pos as i64;
            bits.write_exp_golomb((pos - prev_pos - 1) as u64, order);
            prev_pos = pos;
        }
    }
}

/// Reader for one record at the start of an arena range.
#[derive(Debug)]
pub struct FeatureDecoder<'a> {
    bits: BitDecoder<'a>,
    params: FieldParams,
}

impl<'a> FeatureDecoder<'a> {
    pub fn new(params: FieldParams, bytes: &'a [u8]) -> Self {
        Self {
            bits: BitDecoder::new(bytes),
            params,
        }
    }

    /// Bits consumed so far.
    pub fn read_offset(&self) -> u64 {
        self.bits.read_offset()
    }

    /// Decodes the next record into `out`, reusing its allocations.
    pub fn read(&mut self, out: &mut DocFeatures) {
        let num_elements = self.read_num_elements();
        out.elements.truncate(num_elements);
        out.elements.resize_with(num_elements, ElementFeatures::default);

        let length_order = self.params.length_order();
        let mut prev_id: i64 = -1;
        for element in out.elements.iter_mut() {
            element.element_id = 0;
            if self.params.has_elements {
                let id = prev_id + 1 + self.bits.read_exp_golomb(0) as i64;
                element.element_id = id as u32;
                prev_id = id;
            }
            element.weight = 1;
            if self.params.has_element_weights {
                element.weight = zigzag_decode(self.bits.read_exp_golomb(0));
            }
            element.element_len = (self.bits.read_exp_golomb(length_order) + 1) as u32;
            let num_positions = self.bits.read_exp_golomb(0) as usize + 1;

            let order = position_order(element.element_len, num_positions);
            element.positions.clear();
            let mut prev_pos: i64 = -1;
            for _ in 0..num_positions {
                let pos = prev_pos + 1 + self.bits.read_exp_golomb(order) as i64;
                element.positions.push(pos as u32);
                prev_pos = pos;
            }
        }
    }

    /// Bit length of the record at the start of `bytes`.
    pub fn measure(params: FieldParams, bytes: &[u8]) -> u64 {
        let mut decoder = FeatureDecoder::new(params, bytes);
        decoder.skip_one_record();
        decoder.read_offset()
    }

    /// Consumes the next record without materializing it.
    pub fn skip_one_record(&mut self) {
        let num_elements = self.read_num_elements();
        let length_order = self.params.length_order();
        for _ in 0..num_elements {
            if self.params.has_elements {
                self.bits.skip_exp_golomb(0);
            }
            if self.params.has_element_weights {
                self.bits.skip_exp_golomb(0);
            }
            let element_len = (self.bits.read_exp_golomb(length_order) + 1) as u32;
            let num_positions = self.bits.read_exp_golomb(0) as usize + 1;
            let order = position_order(element_len, num_positions);
            for _ in 0..num_positions {
                self.bits.skip_exp_golomb(order);
            }
        }
    }

    fn read_num_elements(&mut self) -> usize {
        if self.params.has_elements {
            self.bits.read_exp_golomb(0) as usize + 1
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CollectionType;

    fn encoder_for(collection_type: CollectionType) -> FeatureEncoder {
        let mut enc = FeatureEncoder::new(vec![FieldParams::new(collection_type, 16)], 2000);
        enc.select_field(0).unwrap();
        enc
    }

    fn window_bytes(enc: &FeatureEncoder, begin: u64, end: u64) -> Vec<u8> {
        let byte_len = ((end - begin + 7) / 8) as usize;
        let mut bytes = vec![0u8; byte_len + 7];
        enc.copy_window(begin, &mut bytes[..byte_len]);
        bytes
    }

    fn round_trip(collection_type: CollectionType, record: &DocFeatures) -> (DocFeatures, u64) {
        let mut enc = encoder_for(collection_type);
        let (begin, end) = enc.write(record).unwrap();
        let bytes = window_bytes(&enc, begin, end);

        let mut dec = FeatureDecoder::new(*enc.field_params(0).unwrap(), &bytes);
        let mut out = DocFeatures::default();
        dec.read(&mut out);
        assert_eq!(dec.read_offset(), end - begin);
        (out, end - begin)
    }

    #[test]
    fn test_single_round_trip() {
        let record = DocFeatures::single(40, vec![0, 1, 17, 39]);
        let (out, _) = round_trip(CollectionType::Single, &record);
        assert_eq!(out, record);
    }

    #[test]
    fn test_array_round_trip() {
        let record = DocFeatures::new(vec![
            ElementFeatures::new(0, 3, vec![2]),
            ElementFeatures::new(4, 100, vec![5, 50, 99]),
            ElementFeatures::new(5, 1, vec![0]),
        ]);
        let (out, _) = round_trip(CollectionType::Array, &record);
        assert_eq!(out, record);
    }

    #[test]
    fn test_weighted_set_round_trip() {
        let record = DocFeatures::new(vec![
            ElementFeatures::new(1, 2, vec![0]).with_weight(-7),
            ElementFeatures::new(9, 2, vec![1]).with_weight(i32::MAX),
        ]);
        let (out, _) = round_trip(CollectionType::WeightedSet, &record);
        assert_eq!(out, record);
    }

    #[test]
    fn test_smallest_record_bit_length() {
        // len-1 = 0 at order 4 (5 bits), one position (1 bit), delta 0 at order 0 (1 bit)
        let record = DocFeatures::single(1, vec![0]);
        let (_, bits) = round_trip(CollectionType::Single, &record);
        assert_eq!(bits, 7);
    }

    #[test]
    fn test_write_leaves_offset_aligned() {
        let mut enc = encoder_for(CollectionType::Single);
        let (begin, end) = enc.write(&DocFeatures::single(8, vec![1, 2])).unwrap();
        assert_eq!(begin, 0);
        assert!(end > 0 && end < 64);
        assert_eq!(enc.write_offset(), 64);

        let (begin, _) = enc.write(&DocFeatures::single(8, vec![3])).unwrap();
        assert_eq!(begin, 64);
        assert_eq!(enc.write_offset(), 128);
    }

    #[test]
    fn test_skip_matches_read() {
        let record = DocFeatures::new(vec![
            ElementFeatures::new(2, 700, (0..60).map(|p| p * 11).collect()).with_weight(3),
            ElementFeatures::new(3, 5, vec![4]).with_weight(-1),
        ]);
        let mut enc = encoder_for(CollectionType::WeightedSet);
        let (begin, end) = enc.write(&record).unwrap();
        let bytes = window_bytes(&enc, begin, end);

        let mut dec = FeatureDecoder::new(*enc.field_params(0).unwrap(), &bytes);
        dec.skip_one_record();
        assert_eq!(dec.read_offset(), end - begin);
    }

    #[test]
    fn test_read_reuses_output() {
        let record = DocFeatures::single(4, vec![3]);
        let mut enc = encoder_for(CollectionType::Single);
        let (begin, end) = enc.write(&record).unwrap();
        let bytes = window_bytes(&enc, begin, end);

        let mut out = DocFeatures::new(vec![
            ElementFeatures::new(5, 9, vec![1, 2, 3]).with_weight(8),
            ElementFeatures::new(6, 9, vec![4]),
        ]);
        FeatureDecoder::new(*enc.field_params(0).unwrap(), &bytes).read(&mut out);
        assert_eq!(out, record);
    }

    #[test]
    fn test_invalid_record_writes_nothing() {
        let mut enc = encoder_for(CollectionType::Single);
        let err = enc.write(&DocFeatures::default()).unwrap_err();
        assert_eq!(err.code(), "MEMINDEX_INVALID_RECORD");
        assert_eq!(enc.write_offset(), 0);
    }

    #[test]
    fn test_select_unknown_field() {
        let mut enc = encoder_for(CollectionType::Single);
        assert_eq!(
            enc.select_field(3).unwrap_err(),
            FeatureStoreError::UnknownField {
                index: 3,
                field_count: 1
            }
        );
        assert_eq!(enc.selected_field(), Some(0));
    }

    #[test]
    fn test_reset_only_above_threshold() {
        let mut enc = FeatureEncoder::new(vec![FieldParams::default()], 64);
        enc.select_field(0).unwrap();
        enc.write(&DocFeatures::single(2, vec![1])).unwrap();
        assert_eq!(enc.write_offset(), 64);
        assert!(!enc.reset_if_over_threshold());

        enc.write(&DocFeatures::single(2, vec![1])).unwrap();
        assert!(enc.reset_if_over_threshold());
        assert_eq!(enc.write_offset(), 0);
    }

    #[test]
    #[should_panic(expected = "empty feature window")]
    fn test_seal_empty_window_panics() {
        FeatureEncoder::seal(64, 64);
    }

    #[test]
    #[should_panic(expected = "without a selected field")]
    fn test_write_without_field_panics() {
        let mut enc = FeatureEncoder::new(vec![FieldParams::default()], 2000);
        let _ = enc.write(&DocFeatures::single(1, vec![0]));
    }
}
