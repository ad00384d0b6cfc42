//! FeatureStore - feature records committed into the buffer arena
//!
//! A commit encodes the record into the scratch window, then copies exactly
//! that window, rounded up to whole bytes, into a fresh arena allocation.
//! The store keeps no per-entry metadata: a reference is only meaningful
//! together with the packed field index it was committed for.
//!
//! Reader threads decode through a [`FeatureStoreReader`] while the writer
//! keeps committing.

use std::sync::Arc;

use super::codec::{FeatureDecoder, FeatureEncoder};
use super::{DocFeatures, FeatureStoreError, FeatureStoreReader, FeatureStoreResult, FieldParams};
use crate::config::{ConfigError, FeatureStoreConfig};
use crate::datastore::{BufferId, BufferType, DataStore, EntryRef, MemoryUsage, TypeId};
use crate::generation::Generation;
use crate::observability::{MetricsRegistry, MetricsSnapshot};
use crate::schema::IndexSchema;

/// Bytes needed to hold `bits` bits.
#[inline]
pub fn byte_len(bits: u64) -> usize {
    ((bits + 7) / 8) as usize
}

/// Feature records of all indexed fields of one index.
#[derive(Debug)]
pub struct FeatureStore {
    store: DataStore,
    type_id: TypeId,
    encoder: FeatureEncoder,
    fields: Arc<[FieldParams]>,
    max_record_bits: u64,
}

impl FeatureStore {
    /// Creates a store for every field of `schema`.
    ///
    /// Validates `config` and applies its log level.
    pub fn new(schema: &IndexSchema, config: &FeatureStoreConfig) -> FeatureStoreResult<Self> {
        config.validate().map_err(|err| FeatureStoreError::InvalidConfig {
            reason: match err {
                ConfigError::Invalid(reason) => reason,
                other => other.to_string(),
            },
        })?;
        config.apply_log_level();

        let mut store = DataStore::new();
        let type_id = store.add_type(BufferType::raw_bytes(config.min_buffer_bytes));
        store.init_active_buffers()?;
        let fields = FieldParams::from_schema(schema);
        Ok(Self {
            store,
            type_id,
            encoder: FeatureEncoder::new(fields.clone(), config.scratch_reset_threshold_bits),
            fields: fields.into(),
            max_record_bits: config.max_record_bits,
        })
    }

    /// Handle for reader threads.
    pub fn reader(&self) -> FeatureStoreReader {
        FeatureStoreReader::new(self.store.reader(), Arc::clone(&self.fields))
    }

    /// Layout parameters of field `index`.
    pub fn field_params(&self, index: u32) -> FeatureStoreResult<&FieldParams> {
        self.encoder.field_params(index)
    }

    /// Encodes and stores `record` for field `index`.
    ///
    /// Returns the reference and the exact bit length of the record.
    pub fn commit(&mut self, index: u32, record: &DocFeatures) -> FeatureStoreResult<(EntryRef, u64)> {
        self.encoder.select_field(index)?;
        if self.encoder.reset_if_over_threshold() {
            self.store.metrics().increment_scratch_resets();
        }
        let (begin, end) = self.encoder.write(record)?;
        let bits = FeatureEncoder::seal(begin, end);
        if bits > self.max_record_bits {
            return Err(FeatureStoreError::RecordTooLarge {
                bits,
                limit: self.max_record_bits,
            });
        }

        let entry = {
            let (entry, mut dst) = self.store.allocate(self.type_id, byte_len(bits))?;
            self.encoder.copy_window(begin, &mut dst);
            entry
        };
        self.store.metrics().record_commit(bits);
        Ok((entry, bits))
    }

    /// Decodes the record at `entry` into `out`.
    pub fn retrieve(&self, index: u32, entry: EntryRef, out: &mut DocFeatures) -> FeatureStoreResult<()> {
        let params = *self.field_params(index)?;
        FeatureDecoder::new(params, self.store.get_bits(entry)).read(out);
        Ok(())
    }

    /// Convenience form of [`retrieve`](Self::retrieve).
    pub fn get(&self, index: u32, entry: EntryRef) -> FeatureStoreResult<DocFeatures> {
        let mut out = DocFeatures::default();
        self.retrieve(index, entry, &mut out)?;
        Ok(out)
    }

    /// Bit length of the record at `entry`, measured by decoding it.
    ///
    /// # Panics
    ///
    /// Panics if the record measures zero bits.
    pub fn bit_length(&self, index: u32, entry: EntryRef) -> FeatureStoreResult<u64> {
        let params = *self.field_params(index)?;
        let bits = FeatureDecoder::measure(params, self.store.get_bits(entry));
        assert!(bits > 0, "record at {:?} measured zero bits", entry);
        Ok(bits)
    }

    /// Copies the record at `entry` into a new allocation and marks the old
    /// range dead. Returns the new reference.
    pub fn relocate(&mut self, index: u32, entry: EntryRef) -> FeatureStoreResult<EntryRef> {
        let bits = self.bit_length(index, entry)?;
        self.relocate_known_length(entry, bits)
    }

    /// Like [`relocate`](Self::relocate) for a caller that kept the length
    /// returned by [`commit`](Self::commit).
    ///
    /// # Panics
    ///
    /// Panics if `bits` is zero.
    pub fn relocate_known_length(&mut self, entry: EntryRef, bits: u64) -> FeatureStoreResult<EntryRef> {
        assert!(bits > 0, "relocating {:?} with zero bit length", entry);
        let len = byte_len(bits);
        let new_entry = self.store.copy_entry(self.type_id, entry, len)?;
        self.store.inc_dead(entry, len);
        self.store.metrics().increment_relocations();
        Ok(new_entry)
    }

    /// Accounts the record at `entry` as dead, e.g. after its document was
    /// removed. The bytes stay readable.
    pub fn inc_dead(&mut self, entry: EntryRef, bits: u64) {
        self.store.inc_dead(entry, byte_len(bits));
    }

    /// Scratch write offset in bits.
    pub fn scratch_write_offset(&self) -> u64 {
        self.encoder.write_offset()
    }

    /// Begins compacting the feature buffers. See [`DataStore::start_compact`].
    pub fn start_compact(&mut self) -> FeatureStoreResult<Vec<BufferId>> {
        Ok(self.store.start_compact(self.type_id)?)
    }

    pub fn finish_compact(&mut self, buffer_ids: &[BufferId]) -> FeatureStoreResult<()> {
        Ok(self.store.finish_compact(buffer_ids)?)
    }

    /// Buffers whose dead fraction exceeds `min_dead_ratio`.
    pub fn compaction_candidates(&self, min_dead_ratio: f64) -> Vec<BufferId> {
        self.store.compaction_candidates(self.type_id, min_dead_ratio)
    }

    pub fn transfer_hold_lists(&mut self, generation: Generation) {
        self.store.transfer_hold_lists(generation);
    }

    pub fn trim_hold_lists(&mut self, oldest_used: Generation) -> usize {
        self.store.trim_hold_lists(oldest_used)
    }

    /// Releases every held buffer. Only valid when no reader remains.
    pub fn clear_hold_lists(&mut self) {
        self.store.clear_hold_lists();
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        self.store.memory_usage()
    }

    /// Underlying arena, for inspection.
    pub fn data_store(&self) -> &DataStore {
        &self.store
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        self.store.metrics()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.store.metrics().snapshot()
    }
}
