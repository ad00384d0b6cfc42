//! Schema error types
//!
//! Error codes:
//! - MEMINDEX_SCHEMA_IO (ERROR)
//! - MEMINDEX_SCHEMA_MALFORMED (ERROR)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::observability::Severity;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema loading errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema file could not be read
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid JSON or invalid schema structure
    #[error("malformed schema at {location}: {reason}")]
    Malformed { location: String, reason: String },
}

impl SchemaError {
    /// Create a malformed schema error
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Io { .. } => "MEMINDEX_SCHEMA_IO",
            SchemaError::Malformed { .. } => "MEMINDEX_SCHEMA_MALFORMED",
        }
    }

    /// A store is never built from a bad schema, so nothing is left corrupt.
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}
