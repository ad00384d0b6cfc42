//! Generation holder - two-stage deferred release of retired resources
//!
//! A retired resource first lands on the untagged hold list. When the writer
//! advances, everything on that list is tagged with the current generation
//! and moved to the tagged FIFO. Trimming releases items from the front of the
//! FIFO while their generation is older than the oldest generation a reader
//! may still be using.
//!
//! The tagged list stays sorted without ever being sorted: each advance tags
//! its whole batch with one generation and generations never go backwards.

use std::collections::VecDeque;
use std::thread;

use super::Generation;
use crate::observability::{log_event_with_fields, Event};

/// A resource whose physical release can be deferred.
pub trait GenerationHeld {
    /// Bytes this resource accounts for while held.
    fn byte_size(&self) -> usize;
}

impl<T: GenerationHeld + ?Sized> GenerationHeld for Box<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

impl GenerationHeld for Vec<u8> {
    fn byte_size(&self) -> usize {
        self.capacity()
    }
}

/// Boxed resource of any kind.
pub type BoxedHeld = Box<dyn GenerationHeld + Send>;

/// One retired resource and, once tagged, its retirement generation.
#[derive(Debug)]
pub struct HeldItem<T> {
    resource: T,
    size: usize,
    generation: Option<Generation>,
}

impl<T> HeldItem<T> {
    /// Accounted size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Retirement generation, `None` until the item has been advanced.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    fn tag(&mut self, generation: Generation) {
        assert!(
            self.generation.is_none(),
            "held item already tagged with generation {:?}",
            self.generation
        );
        self.generation = Some(generation);
    }
}

/// Two-stage hold list keyed by generation.
///
/// Owned by the writer. Dropping a holder that still holds anything is an
/// invariant violation and panics; call [`GenerationHolder::clear`] at
/// shutdown once no reader remains.
#[derive(Debug)]
pub struct GenerationHolder<T: GenerationHeld = BoxedHeld> {
    hold1: Vec<HeldItem<T>>,
    hold2: VecDeque<HeldItem<T>>,
    held_bytes: usize,
}

impl<T: GenerationHeld> GenerationHolder<T> {
    /// Creates an empty holder.
    pub fn new() -> Self {
        Self {
            hold1: Vec::new(),
            hold2: VecDeque::new(),
            held_bytes: 0,
        }
    }

    /// Retires `resource` in the current generation.
    pub fn hold(&mut self, resource: T) {
        let size = resource.byte_size();
        self.hold1.push(HeldItem {
            resource,
            size,
            generation: None,
        });
        self.held_bytes += size;
    }

    /// Tags every untagged item with `current` and moves it to the FIFO.
    pub fn advance(&mut self, current: Generation) {
        if let Some(last) = self.hold2.back().and_then(HeldItem::generation) {
            debug_assert!(
                !current.is_before(last),
                "generation went backwards: {} after {}",
                current,
                last
            );
        }
        for mut item in self.hold1.drain(..) {
            item.tag(current);
            self.hold2.push_back(item);
        }
    }

    /// Releases every item retired strictly before `oldest_used`.
    ///
    /// Returns the number of items released.
    pub fn trim(&mut self, oldest_used: Generation) -> usize {
        self.trim_with(oldest_used, drop)
    }

    /// Like [`trim`](Self::trim), handing each released resource to `release`
    /// in retirement order instead of dropping it.
    pub fn trim_with<F>(&mut self, oldest_used: Generation, mut release: F) -> usize
    where
        F: FnMut(T),
    {
        let mut released = 0;
        while let Some(front) = self.hold2.front() {
            let eligible = front
                .generation
                .map_or(false, |generation| generation.is_before(oldest_used));
            if !eligible {
                break;
            }
            if let Some(item) = self.hold2.pop_front() {
                self.held_bytes -= item.size;
                release(item.resource);
                released += 1;
            }
        }
        released
    }

    /// Empties both lists unconditionally.
    ///
    /// Only valid when no reader can observe any held resource.
    pub fn clear(&mut self) {
        self.clear_with(drop);
    }

    /// Like [`clear`](Self::clear), handing every resource to `release`,
    /// tagged items first.
    pub fn clear_with<F>(&mut self, mut release: F)
    where
        F: FnMut(T),
    {
        if !self.is_empty() {
            let held = self.held_bytes.to_string();
            let items = (self.hold1.len() + self.hold2.len()).to_string();
            log_event_with_fields(
                Event::HoldListsCleared,
                &[("held_bytes", held.as_str()), ("items", items.as_str())],
            );
        }
        for item in self.hold2.drain(..).chain(self.hold1.drain(..)) {
            release(item.resource);
        }
        self.held_bytes = 0;
    }

    /// Total bytes currently held on both lists.
    pub fn held_bytes(&self) -> usize {
        self.held_bytes
    }

    /// Number of items retired since the last advance.
    pub fn untagged_len(&self) -> usize {
        self.hold1.len()
    }

    /// Number of items tagged and waiting for readers to drain.
    pub fn tagged_len(&self) -> usize {
        self.hold2.len()
    }

    /// Retirement generation of the oldest tagged item.
    pub fn oldest_held_generation(&self) -> Option<Generation> {
        self.hold2.front().and_then(HeldItem::generation)
    }

    /// Returns true if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.hold1.is_empty() && self.hold2.is_empty() && self.held_bytes == 0
    }
}

impl<T: GenerationHeld> Default for GenerationHolder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GenerationHeld> Drop for GenerationHolder<T> {
    fn drop(&mut self) {
        if self.is_empty() || thread::panicking() {
            return;
        }
        let held = self.held_bytes.to_string();
        log_event_with_fields(Event::HoldListsLeaked, &[("held_bytes", held.as_str())]);
        panic!(
            "generation holder dropped with {} untagged, {} tagged items ({} bytes) outstanding",
            self.hold1.len(),
            self.hold2.len(),
            self.held_bytes
        );
    }
}
