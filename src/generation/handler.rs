//! Generation handler - tracks which generations readers still observe
//!
//! The writer bumps the current generation after publishing a change. A
//! reader takes a guard before touching shared data; the guard pins the
//! generation that was current at that moment until it is dropped. The
//! oldest pinned generation is the bound handed to
//! [`GenerationHolder::trim`](super::GenerationHolder::trim).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::Generation;

#[derive(Debug, Default)]
struct HandlerShared {
    current: AtomicU64,
    /// Pinned generation -> number of live guards
    pinned: Mutex<HashMap<u64, usize>>,
}

impl HandlerShared {
    fn pinned(&self) -> MutexGuard<'_, HashMap<u64, usize>> {
        // Every critical section is a single insert or remove
        self.pinned.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Reader registry shared between the writer and reader threads.
///
/// Cloning is cheap and every clone observes the same state. Only the writer
/// may call [`increment_generation`](Self::increment_generation).
#[derive(Debug, Clone, Default)]
pub struct GenerationHandler {
    shared: Arc<HandlerShared>,
}

impl GenerationHandler {
    /// Creates a handler starting at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handler starting at `generation`.
    pub fn starting_at(generation: Generation) -> Self {
        let handler = Self::default();
        handler
            .shared
            .current
            .store(generation.value(), Ordering::Release);
        handler
    }

    /// The generation new guards will pin.
    pub fn current_generation(&self) -> Generation {
        Generation::new(self.shared.current.load(Ordering::Acquire))
    }

    /// Advances the current generation and returns the new value.
    pub fn increment_generation(&self) -> Generation {
        let previous = self.shared.current.fetch_add(1, Ordering::AcqRel);
        Generation::new(previous.wrapping_add(1))
    }

    /// Pins the current generation for the lifetime of the returned guard.
    pub fn take_guard(&self) -> GenerationGuard {
        let mut pinned = self.shared.pinned();
        let generation = self.current_generation();
        *pinned.entry(generation.value()).or_insert(0) += 1;
        GenerationGuard {
            shared: Arc::clone(&self.shared),
            generation,
        }
    }

    /// Oldest generation any live guard pins, or the current generation when
    /// no guard is live.
    pub fn oldest_used_generation(&self) -> Generation {
        let pinned = self.shared.pinned();
        let current = self.current_generation();
        pinned
            .keys()
            .map(|&value| Generation::new(value))
            .max_by_key(|generation| current.distance_from(*generation))
            .unwrap_or(current)
    }

    /// Number of live guards.
    pub fn guard_count(&self) -> usize {
        self.shared.pinned().values().sum()
    }
}

/// Keeps one generation pinned until dropped.
#[derive(Debug)]
pub struct GenerationGuard {
    shared: Arc<HandlerShared>,
    generation: Generation,
}

impl GenerationGuard {
    /// The pinned generation.
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        let mut pinned = self.shared.pinned();
        let key = self.generation.value();
        if let Some(count) = pinned.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                pinned.remove(&key);
            }
        }
    }
}
