//! Buffer arena for immutable, variable-length byte ranges
//!
//! The arena hands out byte ranges from size-classed, append-only buffers and
//! addresses them with compact [`EntryRef`] handles.
//!
//! # Design Principles
//!
//! - Append-only: a range is never rewritten once allocated
//! - Every range is padded to its type's alignment and followed by a zeroed
//!   overread margin
//! - The arena stores bytes, not lengths
//! - Dead-byte counters are a compaction hint, never an authority on liveness
//! - Buffers have fixed storage: a committed range never moves
//! - Retired buffers are released through generation holding, so readers
//!   never lock
//!
//! # Readers
//!
//! The writer owns the [`DataStore`]. Reader threads hold an [`ArenaReader`]
//! and dereference entries under a
//! [`GenerationGuard`](crate::generation::GenerationGuard) while the writer
//! keeps allocating, compacting and trimming.
//!
//! # Capacity
//!
//! A full active buffer is replaced by a new, larger one transparently. Only
//! a request larger than any buffer of its type, or running out of buffer
//! ids, is reported as an error.

mod buffer_memory;
mod buffer_state;
mod buffer_table;
mod buffer_type;
mod entry_ref;
mod errors;
mod store;

pub use buffer_state::{BufferStats, BufferStatus, HeldBuffer};
pub use buffer_table::ArenaReader;
pub use buffer_type::{BufferType, TypeId, DECODE_SAFETY};
pub use entry_ref::{BufferId, EntryRef, BUFFER_BITS, NUM_BUFFERS, OFFSET_BITS};
pub use errors::{ArenaError, ArenaResult};
pub use store::{DataStore, EntryWriter, MemoryUsage};
