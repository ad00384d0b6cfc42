//! Per-field layout parameters
//!
//! Derived once from the schema and looked up by packed field index. They
//! decide which parts of a record are present in the bit stream and which
//! Exp-Golomb orders are used.

use super::{FeatureStoreError, FeatureStoreResult};
use crate::schema::{CollectionType, IndexField, IndexSchema, DEFAULT_AVG_ELEM_LEN};

/// Layout parameters of one indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldParams {
    pub collection_type: CollectionType,
    pub avg_elem_len: u32,
    /// Records carry an element count and element ids
    pub has_elements: bool,
    /// Every element carries a signed weight
    pub has_element_weights: bool,
}

impl FieldParams {
    pub fn new(collection_type: CollectionType, avg_elem_len: u32) -> Self {
        Self {
            collection_type,
            avg_elem_len: avg_elem_len.max(1),
            has_elements: collection_type != CollectionType::Single,
            has_element_weights: collection_type == CollectionType::WeightedSet,
        }
    }

    pub fn from_field(field: &IndexField) -> Self {
        Self::new(field.collection_type, field.avg_elem_len)
    }

    /// Parameters for every field, in packed index order.
    pub fn from_schema(schema: &IndexSchema) -> Vec<FieldParams> {
        schema.fields.iter().map(FieldParams::from_field).collect()
    }

    /// Order of the element length code.
    #[inline]
    pub fn length_order(&self) -> u32 {
        floor_log2(self.avg_elem_len as u64)
    }
}

impl Default for FieldParams {
    fn default() -> Self {
        Self::new(CollectionType::Single, DEFAULT_AVG_ELEM_LEN)
    }
}

/// Parameters of packed field `index`.
pub(crate) fn lookup_field(fields: &[FieldParams], index: u32) -> FeatureStoreResult<&FieldParams> {
    fields.get(index as usize).ok_or(FeatureStoreError::UnknownField {
        index,
        field_count: fields.len(),
    })
}

/// Order of the position delta code for `num_positions` positions spread
/// over `element_len`.
#[inline]
pub(crate) fn position_order(element_len: u32, num_positions: usize) -> u32 {
    floor_log2(element_len as u64 / num_positions.max(1) as u64)
}

/// floor(log2(n)), 0 for n <= 1
#[inline]
fn floor_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        63 - n.leading_zeros()
    }
}
