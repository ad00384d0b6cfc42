//! Index schema
//!
//! The schema lists the indexed fields in packed index order. The feature
//! store derives one set of layout parameters per field from it.

mod errors;
mod loader;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use loader::SchemaLoader;
pub use types::{CollectionType, IndexField, IndexSchema, DEFAULT_AVG_ELEM_LEN};
