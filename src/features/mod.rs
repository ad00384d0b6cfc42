//! Feature store
//!
//! Stores per-document feature records of packed index fields as bit-packed
//! byte ranges in the buffer arena.
//!
//! # Design Principles
//!
//! - One writer owns the scratch encoder and all arena mutation
//! - Committed ranges are immutable; readers decode them without locking
//! - A reference does not record its field or length; callers keep the
//!   `(EntryRef, bit_length)` pair or re-derive the length by decoding
//! - Scratch offsets are word aligned between writes

mod codec;
mod errors;
mod params;
mod reader;
mod record;
mod store;

pub use codec::{FeatureDecoder, FeatureEncoder};
pub use errors::{FeatureStoreError, FeatureStoreResult};
pub use params::FieldParams;
pub use reader::FeatureStoreReader;
pub use record::{DocFeatures, ElementFeatures};
pub use store::{byte_len, FeatureStore};
