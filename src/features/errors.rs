//! Feature store error types
//!
//! Error codes:
//! - MEMINDEX_UNKNOWN_FIELD (ERROR)
//! - MEMINDEX_INVALID_RECORD (ERROR)
//! - MEMINDEX_RECORD_TOO_LARGE (ERROR)
//! - MEMINDEX_CONFIG_INVALID (ERROR)
//! - arena codes, see [`ArenaError::code`]
//!
//! Decode inconsistencies, such as a record measuring zero bits, are
//! programming errors and panic instead.

use thiserror::Error;

use crate::datastore::ArenaError;
use crate::observability::Severity;

/// Result type for feature store operations
pub type FeatureStoreResult<T> = Result<T, FeatureStoreError>;

/// Feature store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureStoreError {
    /// Packed field index not present in the schema
    #[error("unknown packed field index {index} (schema has {field_count} fields)")]
    UnknownField { index: u32, field_count: usize },

    /// Record shape does not match the field's layout
    #[error("invalid record for field {index}: {reason}")]
    InvalidRecord { index: u32, reason: String },

    /// Encoded record exceeds the configured maximum
    #[error("record of {bits} bits exceeds the {limit} bit limit")]
    RecordTooLarge { bits: u64, limit: u64 },

    /// Store configuration failed validation
    #[error("invalid feature store config: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl FeatureStoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            FeatureStoreError::UnknownField { .. } => "MEMINDEX_UNKNOWN_FIELD",
            FeatureStoreError::InvalidRecord { .. } => "MEMINDEX_INVALID_RECORD",
            FeatureStoreError::RecordTooLarge { .. } => "MEMINDEX_RECORD_TOO_LARGE",
            FeatureStoreError::InvalidConfig { .. } => "MEMINDEX_CONFIG_INVALID",
            FeatureStoreError::Arena(err) => err.code(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FeatureStoreError::Arena(err) => err.severity(),
            _ => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = FeatureStoreError::UnknownField {
            index: 7,
            field_count: 2,
        };
        assert_eq!(err.code(), "MEMINDEX_UNKNOWN_FIELD");
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_invalid_config_code() {
        let err = FeatureStoreError::InvalidConfig {
            reason: "min_buffer_bytes must be positive".into(),
        };
        assert_eq!(err.code(), "MEMINDEX_CONFIG_INVALID");
        assert!(err.to_string().contains("min_buffer_bytes"));
    }

    #[test]
    fn test_arena_error_passes_through() {
        let err: FeatureStoreError = ArenaError::NoFreeBuffer(1024).into();
        assert_eq!(err.code(), "MEMINDEX_NO_FREE_BUFFER");
        assert_eq!(err.to_string(), "all 1024 buffer ids are in use");
        assert_eq!(err.severity(), Severity::Error);
    }
}
