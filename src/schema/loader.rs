//! Schema loader
//!
//! Reads an [`IndexSchema`] from JSON text or a JSON file and validates its
//! structure before handing it out.

use std::fs;
use std::path::Path;

use super::errors::{SchemaError, SchemaResult};
use super::types::IndexSchema;

/// Loads index schemas from JSON.
pub struct SchemaLoader;

impl SchemaLoader {
    /// Parses and validates a schema from JSON text.
    pub fn from_json_str(content: &str) -> SchemaResult<IndexSchema> {
        Self::parse(content, "<in-memory>")
    }

    /// Reads, parses and validates a schema file.
    pub fn load(path: &Path) -> SchemaResult<IndexSchema> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Writes `schema` as pretty JSON.
    pub fn save(schema: &IndexSchema, path: &Path) -> SchemaResult<()> {
        let content = serde_json::to_string_pretty(schema)
            .map_err(|e| SchemaError::malformed(path.display().to_string(), e.to_string()))?;
        fs::write(path, content).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(content: &str, location: &str) -> SchemaResult<IndexSchema> {
        let schema: IndexSchema = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(location, format!("Invalid JSON: {}", e)))?;
        schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed(location, e))?;
        Ok(schema)
    }
}
