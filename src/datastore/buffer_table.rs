//! Buffer table shared by the writer and reader threads
//!
//! Every buffer id owns one slot. The writer installs storage when it
//! activates a buffer and removes it when the generation holder releases the
//! buffer. Readers load slots without locking.

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use super::buffer_memory::BufferMemory;
use super::{BufferId, EntryRef, NUM_BUFFERS};
use crate::generation::GenerationGuard;

pub(crate) struct BufferTable {
    slots: Box<[AtomicPtr<BufferMemory>]>,
}

impl BufferTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: (0..NUM_BUFFERS)
                .map(|_| AtomicPtr::new(ptr::null_mut()))
                .collect(),
        }
    }

    /// Publishes storage for a buffer id that has none.
    pub(crate) fn install(&self, buffer_id: BufferId, memory: BufferMemory) {
        let installed = Box::into_raw(Box::new(memory));
        let previous = self.slots[buffer_id as usize].swap(installed, Ordering::AcqRel);
        assert!(previous.is_null(), "buffer {} installed twice", buffer_id);
    }

    /// Drops the storage of `buffer_id`.
    ///
    /// Only called once no reader can still dereference the buffer.
    pub(crate) fn release(&self, buffer_id: BufferId) {
        let previous = self.slots[buffer_id as usize].swap(ptr::null_mut(), Ordering::AcqRel);
        if !previous.is_null() {
            // SAFETY: the pointer came from `install` and the slot no longer
            // hands it out
            drop(unsafe { Box::from_raw(previous) });
        }
    }

    /// Storage of `buffer_id`, `None` while the buffer is free.
    pub(crate) fn memory(&self, buffer_id: BufferId) -> Option<&BufferMemory> {
        let memory = self.slots.get(buffer_id as usize)?.load(Ordering::Acquire);
        // SAFETY: storage is released only after every caller that could
        // reach it is gone: the writer by `&mut` exclusion, readers by
        // generation guards
        unsafe { memory.as_ref() }
    }
}

impl Drop for BufferTable {
    fn drop(&mut self) {
        for buffer_id in 0..self.slots.len() as BufferId {
            self.release(buffer_id);
        }
    }
}

impl fmt::Debug for BufferTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let installed = (0..self.slots.len() as BufferId)
            .filter(|&id| self.memory(id).is_some())
            .count();
        f.debug_struct("BufferTable")
            .field("installed", &installed)
            .finish()
    }
}

/// Read-only handle to the buffers of a [`DataStore`](super::DataStore).
///
/// Cheap to clone and usable from any thread while the writer keeps
/// allocating. A reader takes a [`GenerationGuard`] from the handler whose
/// generations drive the store's hold lists, and only then looks up the
/// references it is going to dereference. The returned bytes are borrowed
/// from the guard: the buffer they live in cannot be released before the
/// guard is dropped.
#[derive(Debug, Clone)]
pub struct ArenaReader {
    table: Arc<BufferTable>,
}

impl ArenaReader {
    pub(crate) fn new(table: Arc<BufferTable>) -> Self {
        Self { table }
    }

    /// Published bytes from `entry` to the end of its buffer's published
    /// region.
    ///
    /// Unlike [`DataStore::get_bits`](super::DataStore::get_bits) the view
    /// stops at the published region, since the writer may be filling the
    /// bytes after it. [`BitDecoder`](crate::bitcode::BitDecoder) reads
    /// past the end of a slice as zero bits.
    ///
    /// # Panics
    ///
    /// Panics if the buffer has been released or `entry` has not been
    /// published.
    pub fn get_bits<'a>(&'a self, _guard: &'a GenerationGuard, entry: EntryRef) -> &'a [u8] {
        let memory = self
            .table
            .memory(entry.buffer_id())
            .unwrap_or_else(|| panic!("dereferencing {:?} in a released buffer", entry));
        memory.published_from(entry.offset() as usize * memory.alignment())
    }

    /// Exactly `byte_len` bytes at `entry`.
    pub fn get_entry<'a>(
        &'a self,
        guard: &'a GenerationGuard,
        entry: EntryRef,
        byte_len: usize,
    ) -> &'a [u8] {
        &self.get_bits(guard, entry)[..byte_len]
    }
}
