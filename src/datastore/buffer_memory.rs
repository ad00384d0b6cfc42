//! Fixed backing storage of one buffer
//!
//! Storage is allocated zeroed once, when the buffer is activated, and never
//! moves or grows. Bytes below the published cursor are immutable; the
//! writer only ever writes at or above it. Padding and overread margin are
//! never written at all, so they stay zero without being cleared.

use std::fmt;
use std::ptr::NonNull;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Zeroed, fixed-size byte storage shared between the writer and readers.
pub(crate) struct BufferMemory {
    bytes: NonNull<[u8]>,
    alignment: usize,
    /// End of the region readers may see
    published: AtomicUsize,
}

// SAFETY: bytes below `published` are only read; the single writer writes
// bytes at or above it through `slice_mut`, whose callers guarantee
// exclusivity.
unsafe impl Send for BufferMemory {}
unsafe impl Sync for BufferMemory {}

impl BufferMemory {
    /// Allocates `size` zero bytes. Bytes below `published` are visible to
    /// readers immediately.
    pub(crate) fn new(size: usize, alignment: usize, published: usize) -> Self {
        assert!(published <= size, "published {} past size {}", published, size);
        let bytes: &mut [u8] = Box::leak(vec![0u8; size].into_boxed_slice());
        Self {
            bytes: NonNull::from(bytes),
            alignment,
            published: AtomicUsize::new(published),
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub(crate) fn alignment(&self) -> usize {
        self.alignment
    }

    /// End of the published region.
    #[inline]
    pub(crate) fn published(&self) -> usize {
        self.published.load(Ordering::Acquire)
    }

    /// Makes every byte below `end` visible to readers.
    pub(crate) fn publish(&self, end: usize) {
        debug_assert!(end <= self.size());
        debug_assert!(end >= self.published.load(Ordering::Relaxed));
        self.published.store(end, Ordering::Release);
    }

    /// Published bytes from `start` to the end of the published region.
    ///
    /// # Panics
    ///
    /// Panics if `start` is not inside the published region.
    pub(crate) fn published_from(&self, start: usize) -> &[u8] {
        let end = self.published();
        assert!(
            start < end,
            "offset {} is past the published region of {} bytes",
            start,
            end
        );
        // SAFETY: the region below `published` is never written again
        unsafe { self.slice(start, end) }
    }

    /// Bytes `[start, end)`.
    ///
    /// # Safety
    ///
    /// No write may touch `[start, end)` while the returned slice lives.
    pub(crate) unsafe fn slice(&self, start: usize, end: usize) -> &[u8] {
        assert!(start <= end && end <= self.size(), "range {}..{} out of bounds", start, end);
        slice::from_raw_parts(self.base().add(start), end - start)
    }

    /// Writable bytes `[start, end)`.
    ///
    /// # Safety
    ///
    /// `start` must be at or above the published cursor and the caller must
    /// hold the only reference to `[start, end)` until the range is published.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slice_mut(&self, start: usize, end: usize) -> &mut [u8] {
        assert!(start <= end && end <= self.size(), "range {}..{} out of bounds", start, end);
        debug_assert!(start >= self.published.load(Ordering::Relaxed));
        slice::from_raw_parts_mut(self.base().add(start), end - start)
    }

    #[inline]
    fn base(&self) -> *mut u8 {
        self.bytes.as_ptr() as *mut u8
    }
}

impl Drop for BufferMemory {
    fn drop(&mut self) {
        // SAFETY: `bytes` came from `Box::leak` in `new` and is dropped once
        drop(unsafe { Box::from_raw(self.bytes.as_ptr()) });
    }
}

impl fmt::Debug for BufferMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferMemory")
            .field("size", &self.size())
            .field("alignment", &self.alignment)
            .field("published", &self.published())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_memory_is_zeroed() {
        let memory = BufferMemory::new(64, 4, 4);
        assert_eq!(memory.size(), 64);
        assert_eq!(memory.published(), 4);
        assert!(unsafe { memory.slice(0, 64) }.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_publish_extends_visible_region() {
        let memory = BufferMemory::new(32, 4, 0);
        unsafe { memory.slice_mut(0, 3) }.copy_from_slice(&[1, 2, 3]);
        memory.publish(4);

        assert_eq!(memory.published_from(0), &[1, 2, 3, 0]);
        assert_eq!(memory.published_from(2), &[3, 0]);
    }

    #[test]
    fn test_storage_never_moves() {
        let memory = BufferMemory::new(256, 4, 0);
        let before = memory.base();
        for end in (4..=256).step_by(4) {
            unsafe { memory.slice_mut(end - 4, end) }.copy_from_slice(&[9; 4]);
            memory.publish(end);
        }
        assert_eq!(memory.base(), before);
        assert_eq!(memory.published_from(0).as_ptr(), before as *const u8);
    }

    #[test]
    #[should_panic(expected = "past the published region")]
    fn test_unpublished_offset_panics() {
        let memory = BufferMemory::new(32, 4, 8);
        memory.published_from(8);
    }
}
