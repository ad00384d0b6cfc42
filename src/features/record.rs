//! Feature records
//!
//! A record is the per-document payload of one indexed field: the field's
//! elements, each with its length in positions and the positions where the
//! term occurs.

use super::FieldParams;

/// Occurrences of a term in one element of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFeatures {
    /// Index of the element within the field value, 0 for single fields
    pub element_id: u32,
    /// Element weight, 1 unless the field is a weighted set
    pub weight: i32,
    /// Element length in positions
    pub element_len: u32,
    /// Word positions, strictly ascending
    pub positions: Vec<u32>,
}

impl ElementFeatures {
    pub fn new(element_id: u32, element_len: u32, positions: Vec<u32>) -> Self {
        Self {
            element_id,
            weight: 1,
            element_len,
            positions,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

impl Default for ElementFeatures {
    fn default() -> Self {
        Self::new(0, 1, Vec::new())
    }
}

/// Feature record of one document in one field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocFeatures {
    pub elements: Vec<ElementFeatures>,
}

impl DocFeatures {
    pub fn new(elements: Vec<ElementFeatures>) -> Self {
        Self { elements }
    }

    /// Record of a single-valued field.
    pub fn single(element_len: u32, positions: Vec<u32>) -> Self {
        Self::new(vec![ElementFeatures::new(0, element_len, positions)])
    }

    pub fn push(&mut self, element: ElementFeatures) {
        self.elements.push(element);
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Total number of positions over all elements.
    pub fn num_occurrences(&self) -> usize {
        self.elements.iter().map(|e| e.positions.len()).sum()
    }

    /// Checks that the record can be encoded with `params`.
    pub fn validate(&self, params: &FieldParams) -> Result<(), String> {
        if self.elements.is_empty() {
            return Err("record has no elements".into());
        }
        if !params.has_elements && self.elements.len() > 1 {
            return Err(format!(
                "{} elements on a {} field",
                self.elements.len(),
                params.collection_type.type_name()
            ));
        }

        let mut prev_id: Option<u32> = None;
        for element in &self.elements {
            if !params.has_elements && element.element_id != 0 {
                return Err(format!(
                    "element id {} on a {} field",
                    element.element_id,
                    params.collection_type.type_name()
                ));
            }
            if prev_id.map_or(false, |prev| element.element_id <= prev) {
                return Err(format!("element id {} is not ascending", element.element_id));
            }
            prev_id = Some(element.element_id);

            if !params.has_element_weights && element.weight != 1 {
                return Err(format!(
                    "weight {} on element {} of a field without weights",
                    element.weight, element.element_id
                ));
            }
            if element.element_len == 0 {
                return Err(format!("element {} has zero length", element.element_id));
            }
            if element.positions.is_empty() {
                return Err(format!("element {} has no positions", element.element_id));
            }

            let mut prev_pos: Option<u32> = None;
            for &pos in &element.positions {
                if prev_pos.map_or(false, |prev| pos <= prev) {
                    return Err(format!(
                        "position {} in element {} is not ascending",
                        pos, element.element_id
                    ));
                }
                if pos >= element.element_len {
                    return Err(format!(
                        "position {} outside element {} of length {}",
                        pos, element.element_id, element.element_len
                    ));
                }
                prev_pos = Some(pos);
            }
        }
        Ok(())
    }
}
