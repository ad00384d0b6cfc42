//! Per-buffer state and accounting
//!
//! Lifecycle: `Free -> Active -> Hold -> Free`.
//!
//! This is the writer's bookkeeping only. The bytes live in a
//! [`BufferMemory`] of `limit + margin` bytes, fixed at activation, that the
//! store publishes in its buffer table.

use std::fmt;

use super::buffer_memory::BufferMemory;
use super::{BufferId, BufferType, TypeId};
use crate::generation::GenerationHeld;

/// Lifecycle state of a buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatus {
    /// No storage, id may be handed out
    Free,
    /// Readable; the type's primary buffer also accepts allocations
    Active,
    /// Retired, readable until the generation holder releases it
    Hold,
}

impl fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BufferStatus::Free => "free",
            BufferStatus::Active => "active",
            BufferStatus::Hold => "hold",
        };
        write!(f, "{}", s)
    }
}

/// One buffer slot of a data store.
#[derive(Debug)]
pub(crate) struct BufferState {
    pub(crate) status: BufferStatus,
    pub(crate) type_id: TypeId,
    /// Write cursor in bytes
    pub(crate) used: usize,
    /// Bytes at the head that never belong to an allocation
    pub(crate) reserved: usize,
    pub(crate) dead: usize,
    /// Hard limit for `used`
    pub(crate) limit: usize,
    pub(crate) margin: usize,
}

impl BufferState {
    pub(crate) fn free() -> Self {
        Self {
            status: BufferStatus::Free,
            type_id: 0,
            used: 0,
            reserved: 0,
            dead: 0,
            limit: 0,
            margin: 0,
        }
    }

    /// Turns a free slot into an active buffer of `ty` that can hand out
    /// `limit` bytes, and returns its storage.
    pub(crate) fn activate(
        &mut self,
        buffer_id: BufferId,
        type_id: TypeId,
        ty: &BufferType,
        limit: usize,
    ) -> BufferMemory {
        assert_eq!(
            self.status,
            BufferStatus::Free,
            "buffer {} activated while {}",
            buffer_id,
            self.status
        );
        // Buffer 0 keeps its first unit so no reference encodes as raw 0
        let reserved = if buffer_id == 0 { ty.alignment() } else { 0 };
        let limit = limit.max(reserved);

        self.status = BufferStatus::Active;
        self.type_id = type_id;
        self.used = reserved;
        self.reserved = reserved;
        self.dead = 0;
        self.limit = limit;
        self.margin = ty.overread_margin();
        BufferMemory::new(limit + self.margin, ty.alignment(), reserved)
    }

    /// Returns true if `aligned_len` more bytes fit below the limit.
    pub(crate) fn has_room(&self, aligned_len: usize) -> bool {
        self.status == BufferStatus::Active && self.used + aligned_len <= self.limit
    }

    /// Reserves `aligned_len` bytes and returns the byte offset of the new
    /// range. The storage past the cursor has never been written, so the
    /// range, its padding and the margin after it are zero.
    pub(crate) fn push_back(&mut self, aligned_len: usize) -> usize {
        debug_assert!(self.has_room(aligned_len));
        let offset = self.used;
        self.used += aligned_len;
        offset
    }

    /// Storage bytes of the buffer, margin included.
    pub(crate) fn size(&self) -> usize {
        if self.status == BufferStatus::Free {
            0
        } else {
            self.limit + self.margin
        }
    }

    /// Marks the buffer as retired. The bytes stay readable until the
    /// generation holder releases the returned token.
    pub(crate) fn retire(&mut self, buffer_id: BufferId) -> HeldBuffer {
        self.status = BufferStatus::Hold;
        HeldBuffer {
            buffer_id,
            bytes: self.size(),
        }
    }

    pub(crate) fn stats(&self, buffer_id: BufferId) -> BufferStats {
        BufferStats {
            buffer_id,
            status: self.status,
            type_id: self.type_id,
            used_bytes: self.used - self.reserved,
            dead_bytes: self.dead,
            capacity_bytes: self.size(),
            limit_bytes: self.limit,
        }
    }
}

/// Retired buffer waiting in the generation holder.
#[derive(Debug)]
pub struct HeldBuffer {
    buffer_id: BufferId,
    bytes: usize,
}

impl HeldBuffer {
    pub fn buffer_id(&self) -> BufferId {
        self.buffer_id
    }
}

impl GenerationHeld for HeldBuffer {
    fn byte_size(&self) -> usize {
        self.bytes
    }
}

/// Read-only view of one buffer's accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferStats {
    pub buffer_id: BufferId,
    pub status: BufferStatus,
    pub type_id: TypeId,
    /// Bytes handed out by allocations, margins excluded
    pub used_bytes: usize,
    /// Bytes of allocations marked dead
    pub dead_bytes: usize,
    /// Bytes currently reserved by the backing storage
    pub capacity_bytes: usize,
    /// Maximum bytes this buffer may hand out
    pub limit_bytes: usize,
}

impl BufferStats {
    /// Fraction of used bytes that are dead, 0.0 for an empty buffer.
    pub fn dead_ratio(&self) -> f64 {
        if self.used_bytes == 0 {
            0.0
        } else {
            self.dead_bytes as f64 / self.used_bytes as f64
        }
    }
}
