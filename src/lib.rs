//! memindex - in-memory storage core for feature records of a search index
//!
//! - `datastore`: size-classed, append-only buffer arena addressed by `EntryRef`
//! - `features`: bit-packed feature records committed into the arena
//! - `generation`: deferred release of retired buffers until readers drain

pub mod bitcode;
pub mod config;
pub mod datastore;
pub mod features;
pub mod generation;
pub mod observability;
pub mod schema;

pub use config::{ConfigError, FeatureStoreConfig};
pub use datastore::{ArenaReader, DataStore, EntryRef};
pub use features::{DocFeatures, ElementFeatures, FeatureStore, FeatureStoreError, FeatureStoreReader};
pub use generation::{GenerationHandler, GenerationHolder};
pub use schema::{IndexField, IndexSchema};
