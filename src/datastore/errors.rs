//! Arena error types
//!
//! Error codes:
//! - MEMINDEX_ALLOCATION_TOO_LARGE (ERROR)
//! - MEMINDEX_NO_FREE_BUFFER (ERROR)
//! - MEMINDEX_UNKNOWN_BUFFER_TYPE (ERROR)
//!
//! A full active buffer is not an error: the store switches to a new buffer.

use thiserror::Error;

use super::{BufferId, TypeId};
use crate::observability::Severity;

/// Result type for arena operations
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Buffer arena errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// A single request can never fit in one buffer of its type
    #[error("allocation of {requested} bytes exceeds the {limit} byte limit of buffer type {type_id}")]
    AllocationTooLarge {
        type_id: TypeId,
        requested: usize,
        limit: usize,
    },

    /// Every buffer id is active or on hold
    #[error("all {0} buffer ids are in use")]
    NoFreeBuffer(u32),

    /// Type id was never registered
    #[error("unknown buffer type {0}")]
    UnknownType(TypeId),

    /// Buffer cannot be put on hold in its current state
    #[error("buffer {0} is not active")]
    BufferNotActive(BufferId),
}

impl ArenaError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ArenaError::AllocationTooLarge { .. } => "MEMINDEX_ALLOCATION_TOO_LARGE",
            ArenaError::NoFreeBuffer(_) => "MEMINDEX_NO_FREE_BUFFER",
            ArenaError::UnknownType(_) => "MEMINDEX_UNKNOWN_BUFFER_TYPE",
            ArenaError::BufferNotActive(_) => "MEMINDEX_BUFFER_NOT_ACTIVE",
        }
    }

    /// Arena errors leave the store usable.
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ArenaError::NoFreeBuffer(1024).code(), "MEMINDEX_NO_FREE_BUFFER");
        assert_eq!(ArenaError::UnknownType(3).code(), "MEMINDEX_UNKNOWN_BUFFER_TYPE");
    }

    #[test]
    fn test_display_contains_context() {
        let err = ArenaError::AllocationTooLarge {
            type_id: 0,
            requested: 100,
            limit: 64,
        };
        let display = err.to_string();
        assert!(display.contains("100"));
        assert!(display.contains("64"));
        assert_eq!(err.severity(), Severity::Error);
    }
}
