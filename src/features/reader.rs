//! FeatureStoreReader - decoding committed records from reader threads

use std::sync::Arc;

use super::codec::FeatureDecoder;
use super::params::lookup_field;
use super::{DocFeatures, FeatureStoreResult, FieldParams};
use crate::datastore::{ArenaReader, EntryRef};
use crate::generation::GenerationGuard;

/// Read-only view of a [`FeatureStore`](super::FeatureStore).
///
/// Clone one per reader thread. Every call takes the guard under which the
/// caller obtained `entry`; see [`ArenaReader`] for the protocol.
#[derive(Debug, Clone)]
pub struct FeatureStoreReader {
    arena: ArenaReader,
    fields: Arc<[FieldParams]>,
}

impl FeatureStoreReader {
    pub(crate) fn new(arena: ArenaReader, fields: Arc<[FieldParams]>) -> Self {
        Self { arena, fields }
    }

    pub fn field_params(&self, index: u32) -> FeatureStoreResult<&FieldParams> {
        lookup_field(&self.fields, index)
    }

    /// Decodes the record at `entry` into `out`.
    pub fn retrieve(
        &self,
        guard: &GenerationGuard,
        index: u32,
        entry: EntryRef,
        out: &mut DocFeatures,
    ) -> FeatureStoreResult<()> {
        let params = *self.field_params(index)?;
        FeatureDecoder::new(params, self.arena.get_bits(guard, entry)).read(out);
        Ok(())
    }

    pub fn get(&self, guard: &GenerationGuard, index: u32, entry: EntryRef) -> FeatureStoreResult<DocFeatures> {
        let mut out = DocFeatures::default();
        self.retrieve(guard, index, entry, &mut out)?;
        Ok(out)
    }

    /// Bit length of the record at `entry`, measured by decoding it.
    ///
    /// # Panics
    ///
    /// Panics if the record measures zero bits.
    pub fn bit_length(&self, guard: &GenerationGuard, index: u32, entry: EntryRef) -> FeatureStoreResult<u64> {
        let params = *self.field_params(index)?;
        let bits = FeatureDecoder::measure(params, self.arena.get_bits(guard, entry));
        assert!(bits > 0, "record at {:?} measured zero bits", entry);
        Ok(bits)
    }
}
