//! DataStore - size-classed, append-only buffer arena
//!
//! Allocations are appended to the active buffer of their type and addressed
//! by an [`EntryRef`]. Every buffer has fixed storage, allocated once, so a
//! committed range never moves while its buffer lives. A buffer that cannot
//! fit a request is left as it is and a larger one becomes active instead.
//!
//! Bytes are never rewritten after the allocation is published; only the
//! per-buffer dead-byte counter changes afterwards. Readers on other threads
//! go through an [`ArenaReader`] and need no lock.
//!
//! Retired buffers stay readable. They are tracked by the store's own
//! [`GenerationHolder`], and their storage is dropped and their ids become
//! reusable only once trimming proves no reader can still use them.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::buffer_memory::BufferMemory;
use super::buffer_state::{BufferState, BufferStats, BufferStatus, HeldBuffer};
use super::buffer_table::{ArenaReader, BufferTable};
use super::errors::{ArenaError, ArenaResult};
use super::{BufferId, BufferType, EntryRef, TypeId, NUM_BUFFERS};
use crate::generation::{Generation, GenerationHeld, GenerationHolder};
use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};

/// Aggregated memory accounting of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes of backing storage of active buffers
    pub allocated_bytes: usize,
    /// Bytes handed out by allocations
    pub used_bytes: usize,
    /// Bytes of allocations marked dead
    pub dead_bytes: usize,
    /// Bytes of retired buffers waiting for readers to drain
    pub hold_bytes: usize,
}

/// Writable payload of a fresh allocation.
///
/// The range becomes visible to readers when the writer is dropped.
#[derive(Debug)]
pub struct EntryWriter<'a> {
    memory: &'a BufferMemory,
    start: usize,
    len: usize,
    publish_end: usize,
}

impl Deref for EntryWriter<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the range is unpublished and this writer is its only handle
        unsafe { self.memory.slice(self.start, self.start + self.len) }
    }
}

impl DerefMut for EntryWriter<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` excludes the shared view
        unsafe { self.memory.slice_mut(self.start, self.start + self.len) }
    }
}

impl Drop for EntryWriter<'_> {
    fn drop(&mut self) {
        self.memory.publish(self.publish_end);
    }
}

/// Buffer arena.
///
/// All mutating calls belong to the single writer. Reader threads use the
/// handle returned by [`reader`](Self::reader).
#[derive(Debug)]
pub struct DataStore {
    types: Vec<BufferType>,
    active: Vec<Option<BufferId>>,
    buffers: Vec<BufferState>,
    table: Arc<BufferTable>,
    hold: GenerationHolder<HeldBuffer>,
    metrics: MetricsRegistry,
}

impl DataStore {
    /// Creates a store without any buffer types.
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            active: Vec::new(),
            buffers: Vec::new(),
            table: Arc::new(BufferTable::new()),
            hold: GenerationHolder::new(),
            metrics: MetricsRegistry::new(),
        }
    }

    /// Registers a buffer type and returns its id.
    pub fn add_type(&mut self, ty: BufferType) -> TypeId {
        self.types.push(ty);
        self.active.push(None);
        (self.types.len() - 1) as TypeId
    }

    /// Activates one buffer for every registered type that has none.
    pub fn init_active_buffers(&mut self) -> ArenaResult<()> {
        for type_id in 0..self.types.len() as TypeId {
            if self.active[type_id as usize].is_none() {
                self.switch_active_buffer(type_id, 0)?;
            }
        }
        Ok(())
    }

    /// Descriptor of a registered type.
    pub fn buffer_type(&self, type_id: TypeId) -> ArenaResult<&BufferType> {
        self.types
            .get(type_id as usize)
            .ok_or(ArenaError::UnknownType(type_id))
    }

    /// Counters shared by the store and its users.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Handle for reader threads.
    pub fn reader(&self) -> ArenaReader {
        ArenaReader::new(Arc::clone(&self.table))
    }

    /// Allocates `byte_len` bytes of type `type_id`.
    ///
    /// The range is rounded up to the type's alignment and followed by the
    /// overread margin; padding and margin are zero. Returns the reference and
    /// the writable payload span of exactly `byte_len` bytes, which is
    /// published to readers when the span is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `byte_len` is zero.
    pub fn allocate(&mut self, type_id: TypeId, byte_len: usize) -> ArenaResult<(EntryRef, EntryWriter<'_>)> {
        assert!(byte_len > 0, "zero-length allocation");
        let ty = self.buffer_type(type_id)?;
        let aligned = ty.align(byte_len);
        let alignment = ty.alignment();
        if aligned > ty.max_allocation() {
            return Err(ArenaError::AllocationTooLarge {
                type_id,
                requested: byte_len,
                limit: ty.max_allocation(),
            });
        }

        let buffer_id = self.ensure_room(type_id, aligned)?;
        let offset = self.buffers[buffer_id as usize].push_back(aligned);
        let entry = EntryRef::new(buffer_id, (offset / alignment) as u32);
        let memory = self
            .table
            .memory(buffer_id)
            .unwrap_or_else(|| panic!("active buffer {} has no storage", buffer_id));
        let writer = EntryWriter {
            memory,
            start: offset,
            len: byte_len,
            publish_end: offset + aligned,
        };
        Ok((entry, writer))
    }

    /// Allocates and copies `src` in one step.
    pub fn allocate_copy(&mut self, type_id: TypeId, src: &[u8]) -> ArenaResult<EntryRef> {
        let (entry, mut dst) = self.allocate(type_id, src.len())?;
        dst.copy_from_slice(src);
        Ok(entry)
    }

    /// Copies the first `byte_len` bytes at `src` into a new allocation of
    /// `type_id`.
    pub fn copy_entry(&mut self, type_id: TypeId, src: EntryRef, byte_len: usize) -> ArenaResult<EntryRef> {
        let table = Arc::clone(&self.table);
        let source = table
            .memory(src.buffer_id())
            .unwrap_or_else(|| panic!("copying {:?} out of a free buffer", src));
        let start = src.offset() as usize * source.alignment();
        let bytes = &source.published_from(start)[..byte_len];
        let (entry, mut dst) = self.allocate(type_id, byte_len)?;
        dst.copy_from_slice(bytes);
        Ok(entry)
    }

    /// Bytes from `entry` to the end of its buffer's written region,
    /// overread margin included.
    ///
    /// The store does not record allocation lengths; the caller must know or
    /// re-derive how many of these bytes belong to the entry.
    ///
    /// Buffers on hold stay readable until they are trimmed.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is free or `entry` lies past its written region.
    pub fn get_bits(&self, entry: EntryRef) -> &[u8] {
        let state = &self.buffers[entry.buffer_id() as usize];
        let memory = self
            .table
            .memory(entry.buffer_id())
            .unwrap_or_else(|| panic!("dereferencing {:?} in a free buffer", entry));
        let offset = entry.offset() as usize * memory.alignment();
        let published = memory.published();
        assert!(offset < published, "{:?} is past the written region", entry);
        // SAFETY: nothing writes to a store borrowed as `&self`
        unsafe { memory.slice(offset, published + state.margin) }
    }

    /// Exactly `byte_len` bytes at `entry`.
    pub fn get_entry(&self, entry: EntryRef, byte_len: usize) -> &[u8] {
        &self.get_bits(entry)[..byte_len]
    }

    /// Accounts `byte_len` bytes at `entry`, plus their alignment padding,
    /// as dead. Memory is not freed.
    pub fn inc_dead(&mut self, entry: EntryRef, byte_len: usize) {
        let state = &mut self.buffers[entry.buffer_id() as usize];
        let dead = self.types[state.type_id as usize].align(byte_len);
        state.dead += dead;
        debug_assert!(state.dead <= state.used - state.reserved);
        self.metrics.add_dead_bytes(dead as u64);
    }

    /// Accounting for one buffer, `None` for ids never handed out.
    pub fn buffer_stats(&self, buffer_id: BufferId) -> Option<BufferStats> {
        self.buffers
            .get(buffer_id as usize)
            .map(|state| state.stats(buffer_id))
    }

    /// Active buffer currently receiving allocations of `type_id`.
    pub fn active_buffer(&self, type_id: TypeId) -> Option<BufferId> {
        self.active.get(type_id as usize).copied().flatten()
    }

    /// Active buffers of `type_id` whose dead fraction exceeds `min_dead_ratio`.
    pub fn compaction_candidates(&self, type_id: TypeId, min_dead_ratio: f64) -> Vec<BufferId> {
        self.buffers
            .iter()
            .enumerate()
            .filter(|(_, state)| state.status == BufferStatus::Active && state.type_id == type_id)
            .map(|(id, state)| state.stats(id as BufferId))
            .filter(|stats| stats.dead_bytes > 0 && stats.dead_ratio() > min_dead_ratio)
            .map(|stats| stats.buffer_id)
            .collect()
    }

    /// Begins compacting `type_id`.
    ///
    /// Returns every active buffer of the type. The type gets a fresh buffer
    /// on its next allocation, so live entries can be moved out of the
    /// returned buffers before [`finish_compact`](Self::finish_compact).
    pub fn start_compact(&mut self, type_id: TypeId) -> ArenaResult<Vec<BufferId>> {
        self.buffer_type(type_id)?;
        let to_hold: Vec<BufferId> = self
            .buffers
            .iter()
            .enumerate()
            .filter(|(_, state)| state.status == BufferStatus::Active && state.type_id == type_id)
            .map(|(id, _)| id as BufferId)
            .collect();
        self.active[type_id as usize] = None;

        let type_field = type_id.to_string();
        let count = to_hold.len().to_string();
        log_event_with_fields(
            Event::CompactStart,
            &[("buffers", count.as_str()), ("type_id", type_field.as_str())],
        );
        Ok(to_hold)
    }

    /// Puts every compacted buffer on hold.
    pub fn finish_compact(&mut self, buffer_ids: &[BufferId]) -> ArenaResult<()> {
        for &buffer_id in buffer_ids {
            self.hold_buffer(buffer_id)?;
        }
        let count = buffer_ids.len().to_string();
        log_event_with_fields(Event::CompactComplete, &[("buffers", count.as_str())]);
        Ok(())
    }

    /// Retires an active buffer into the hold list of the current generation.
    pub fn hold_buffer(&mut self, buffer_id: BufferId) -> ArenaResult<()> {
        let state = self
            .buffers
            .get_mut(buffer_id as usize)
            .filter(|state| state.status == BufferStatus::Active)
            .ok_or(ArenaError::BufferNotActive(buffer_id))?;
        let type_id = state.type_id;
        let held = state.retire(buffer_id);
        if self.active[type_id as usize] == Some(buffer_id) {
            self.active[type_id as usize] = None;
        }

        if Logger::enabled(Event::BufferHeld.severity()) {
            let id_field = buffer_id.to_string();
            let bytes_field = held.byte_size().to_string();
            log_event_with_fields(
                Event::BufferHeld,
                &[("buffer_id", id_field.as_str()), ("bytes", bytes_field.as_str())],
            );
        }
        self.hold.hold(held);
        self.metrics.increment_buffers_held();
        Ok(())
    }

    /// Tags buffers retired since the last call with `generation`.
    pub fn transfer_hold_lists(&mut self, generation: Generation) {
        self.hold.advance(generation);
    }

    /// Releases held buffers retired before `oldest_used` and makes their
    /// ids available again. Returns the number of buffers released.
    pub fn trim_hold_lists(&mut self, oldest_used: Generation) -> usize {
        let buffers = &mut self.buffers;
        let table = &self.table;
        let metrics = &self.metrics;
        self.hold.trim_with(oldest_used, |held| {
            let buffer_id = held.buffer_id();
            table.release(buffer_id);
            buffers[buffer_id as usize] = BufferState::free();
            metrics.record_buffer_freed(held.byte_size() as u64);
            if Logger::enabled(Event::BufferFreed.severity()) {
                let id_field = buffer_id.to_string();
                log_event_with_fields(Event::BufferFreed, &[("buffer_id", id_field.as_str())]);
            }
        })
    }

    /// Releases every held buffer. Only valid when no reader remains.
    pub fn clear_hold_lists(&mut self) {
        let buffers = &mut self.buffers;
        let table = &self.table;
        let metrics = &self.metrics;
        self.hold.clear_with(|held| {
            table.release(held.buffer_id());
            buffers[held.buffer_id() as usize] = BufferState::free();
            metrics.record_buffer_freed(held.byte_size() as u64);
        });
    }

    /// Bytes currently retained by the hold lists.
    pub fn hold_bytes(&self) -> usize {
        self.hold.held_bytes()
    }

    /// Aggregated accounting across all buffers.
    pub fn memory_usage(&self) -> MemoryUsage {
        let mut usage = MemoryUsage {
            hold_bytes: self.hold.held_bytes(),
            ..MemoryUsage::default()
        };
        for state in self.buffers.iter().filter(|s| s.status == BufferStatus::Active) {
            usage.allocated_bytes += state.size();
            usage.used_bytes += state.used - state.reserved;
            usage.dead_bytes += state.dead;
        }
        usage
    }

    /// Ensures the active buffer of `type_id` fits `aligned` more bytes,
    /// switching to a new, larger buffer when it does not. The full buffer
    /// stays active and readable.
    fn ensure_room(&mut self, type_id: TypeId, aligned: usize) -> ArenaResult<BufferId> {
        if let Some(buffer_id) = self.active[type_id as usize] {
            if self.buffers[buffer_id as usize].has_room(aligned) {
                return Ok(buffer_id);
            }
        }
        self.switch_active_buffer(type_id, aligned)
    }

    fn switch_active_buffer(&mut self, type_id: TypeId, needed: usize) -> ArenaResult<BufferId> {
        let previous = self.active[type_id as usize];
        let buffer_id = self.find_free_buffer()?;
        if buffer_id as usize == self.buffers.len() {
            self.buffers.push(BufferState::free());
        }
        let ty = &self.types[type_id as usize];
        let previous_limit = previous.map_or(0, |id| self.buffers[id as usize].limit);
        let reserved = if buffer_id == 0 { ty.alignment() } else { 0 };
        let limit = ty.next_buffer_bytes(previous_limit, reserved + needed);
        let memory = self.buffers[buffer_id as usize].activate(buffer_id, type_id, ty, limit);
        self.table.install(buffer_id, memory);
        self.active[type_id as usize] = Some(buffer_id);
        self.metrics.increment_buffers_activated();

        if !Logger::enabled(Event::BufferActivated.severity()) {
            return Ok(buffer_id);
        }

        let id_field = buffer_id.to_string();
        let type_field = type_id.to_string();
        match previous {
            Some(old) => {
                let old_field = old.to_string();
                log_event_with_fields(
                    Event::BufferSwitched,
                    &[
                        ("buffer_id", id_field.as_str()),
                        ("previous", old_field.as_str()),
                        ("type_id", type_field.as_str()),
                    ],
                );
            }
            None => log_event_with_fields(
                Event::BufferActivated,
                &[("buffer_id", id_field.as_str()), ("type_id", type_field.as_str())],
            ),
        }
        Ok(buffer_id)
    }

    fn find_free_buffer(&self) -> ArenaResult<BufferId> {
        if let Some(id) = self
            .buffers
            .iter()
            .position(|state| state.status == BufferStatus::Free)
        {
            return Ok(id as BufferId);
        }
        if self.buffers.len() < NUM_BUFFERS as usize {
            return Ok(self.buffers.len() as BufferId);
        }
        Err(ArenaError::NoFreeBuffer(NUM_BUFFERS))
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DataStore {
    fn drop(&mut self) {
        // Held storage goes with the buffer table once the last reader
        // handle is gone
        self.hold.clear();
    }
}
