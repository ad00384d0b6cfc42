//! Index schema definitions
//!
//! Field order is significant: the position of a field in
//! [`IndexSchema::fields`] is its packed field index.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default average element length hint, in positions.
pub const DEFAULT_AVG_ELEM_LEN: u32 = 512;

fn default_avg_elem_len() -> u32 {
    DEFAULT_AVG_ELEM_LEN
}

/// Shape of the values an indexed field holds per document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    /// One value per document
    #[default]
    Single,
    /// Ordered list of values
    Array,
    /// Values with an integer weight each
    WeightedSet,
}

impl CollectionType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CollectionType::Single => "single",
            CollectionType::Array => "array",
            CollectionType::WeightedSet => "weighted_set",
        }
    }
}

/// One indexed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    /// Field name, unique within the schema
    pub name: String,
    #[serde(default)]
    pub collection_type: CollectionType,
    /// Expected element length, used to pick code orders
    #[serde(default = "default_avg_elem_len")]
    pub avg_elem_len: u32,
}

impl IndexField {
    pub fn single(name: impl Into<String>) -> Self {
        Self::new(name, CollectionType::Single)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, CollectionType::Array)
    }

    pub fn weighted_set(name: impl Into<String>) -> Self {
        Self::new(name, CollectionType::WeightedSet)
    }

    pub fn new(name: impl Into<String>, collection_type: CollectionType) -> Self {
        Self {
            name: name.into(),
            collection_type,
            avg_elem_len: DEFAULT_AVG_ELEM_LEN,
        }
    }

    /// Overrides the average element length hint
    pub fn with_avg_elem_len(mut self, avg_elem_len: u32) -> Self {
        self.avg_elem_len = avg_elem_len;
        self
    }
}

/// Ordered set of indexed fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexSchema {
    pub fields: Vec<IndexField>,
}

impl IndexSchema {
    /// Create a schema from fields in packed index order
    pub fn new(fields: Vec<IndexField>) -> Self {
        Self { fields }
    }

    /// Appends a field and returns its packed index
    pub fn add_field(&mut self, field: IndexField) -> u32 {
        self.fields.push(field);
        (self.fields.len() - 1) as u32
    }

    /// Packed index of the field called `name`
    pub fn field_index(&self, name: &str) -> Option<u32> {
        self.fields
            .iter()
            .position(|field| field.name == name)
            .map(|index| index as u32)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates the schema structure itself
    pub fn validate_structure(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(format!("field {} has an empty name", index));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(format!("field '{}' is defined more than once", field.name));
            }
            if field.avg_elem_len == 0 {
                return Err(format!("field '{}' must have a positive avg_elem_len", field.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> IndexSchema {
        IndexSchema::new(vec![
            IndexField::single("title"),
            IndexField::array("tags").with_avg_elem_len(8),
            IndexField::weighted_set("categories"),
        ])
    }

    #[test]
    fn test_schema_structure_valid() {
        assert!(sample_schema().validate_structure().is_ok());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut schema = sample_schema();
        schema.add_field(IndexField::single("tags"));
        let result = schema.validate_structure();
        assert!(result.unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let schema = IndexSchema::new(vec![IndexField::single("")]);
        assert!(schema.validate_structure().is_err());
    }

    #[test]
    fn test_zero_avg_elem_len_rejected() {
        let schema = IndexSchema::new(vec![IndexField::array("body").with_avg_elem_len(0)]);
        assert!(schema.validate_structure().unwrap_err().contains("avg_elem_len"));
    }

    #[test]
    fn test_field_index_is_position() {
        let schema = sample_schema();
        assert_eq!(schema.field_index("title"), Some(0));
        assert_eq!(schema.field_index("categories"), Some(2));
        assert_eq!(schema.field_index("missing"), None);
    }

    #[test]
    fn test_json_defaults() {
        let field: IndexField = serde_json::from_str(r#"{"name": "body"}"#).unwrap();
        assert_eq!(field.collection_type, CollectionType::Single);
        assert_eq!(field.avg_elem_len, DEFAULT_AVG_ELEM_LEN);

        let field: IndexField =
            serde_json::from_str(r#"{"name": "cats", "collection_type": "weighted_set"}"#).unwrap();
        assert_eq!(field.collection_type, CollectionType::WeightedSet);
        assert_eq!(field.collection_type.type_name(), "weighted_set");
    }
}
