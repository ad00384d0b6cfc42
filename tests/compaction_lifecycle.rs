//! Compaction Lifecycle Tests
//!
//! Tests for moving live records out of retired buffers:
//! - Held buffers stay readable while a reader pins an older generation
//! - Trimming releases buffers only after every such reader is gone
//! - Released buffer ids are reused
//! - Reader threads decode while the writer compacts and trims
//! - Generation ordering of the hold lists

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use memindex::datastore::{BufferStatus, BufferType, DataStore};
use memindex::features::{DocFeatures, FeatureStore};
use memindex::generation::{Generation, GenerationHandler, GenerationHolder};
use memindex::schema::{IndexField, IndexSchema};
use memindex::{EntryRef, FeatureStoreConfig};

fn single_field_store() -> FeatureStore {
    let schema = IndexSchema::new(vec![IndexField::single("body").with_avg_elem_len(64)]);
    FeatureStore::new(&schema, &FeatureStoreConfig::default()).unwrap()
}

fn record(n: u32) -> DocFeatures {
    DocFeatures::single(n + 1, (0..=n).step_by(3).collect())
}

// =============================================================================
// Feature Store Compaction
// =============================================================================

/// Full cycle: commit, compact, retire, trim behind a reader guard.
#[test]
fn test_compaction_waits_for_reader() {
    let mut store = single_field_store();
    let handler = GenerationHandler::new();

    let committed: Vec<(EntryRef, u64, DocFeatures)> = (0..50)
        .map(|n| {
            let rec = record(n);
            let (entry, bits) = store.commit(0, &rec).unwrap();
            (entry, bits, rec)
        })
        .collect();
    // Half of the records are deleted
    let live: Vec<_> = committed
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 0)
        .map(|(_, c)| c.clone())
        .collect();
    for (entry, bits, _) in committed.iter().skip(1).step_by(2) {
        store.inc_dead(*entry, *bits);
    }
    assert!(store.memory_usage().dead_bytes > 0);

    let reader = handler.take_guard();

    let old_buffers = store.start_compact().unwrap();
    assert_eq!(old_buffers, vec![0]);
    let moved: Vec<(EntryRef, DocFeatures)> = live
        .iter()
        .map(|(entry, _, rec)| (store.relocate(0, *entry).unwrap(), rec.clone()))
        .collect();
    store.finish_compact(&old_buffers).unwrap();

    store.transfer_hold_lists(handler.current_generation());
    handler.increment_generation();

    // The reader pinned the retirement generation; nothing is released
    assert_eq!(store.trim_hold_lists(handler.oldest_used_generation()), 0);
    let status = store.data_store().buffer_stats(0).unwrap().status;
    assert_eq!(status, BufferStatus::Hold);
    for (entry, _, rec) in &live {
        assert_eq!(&store.get(0, *entry).unwrap(), rec);
    }

    drop(reader);
    assert_eq!(store.trim_hold_lists(handler.oldest_used_generation()), 1);
    assert_eq!(store.memory_usage().hold_bytes, 0);
    assert_eq!(store.data_store().buffer_stats(0).unwrap().status, BufferStatus::Free);

    for (entry, rec) in &moved {
        assert_ne!(entry.buffer_id(), 0);
        assert_eq!(&store.get(0, *entry).unwrap(), rec);
    }
    let snapshot = store.snapshot();
    assert_eq!(snapshot.buffers_freed, 1);
    assert_eq!(snapshot.buffers_held, 1);
}

/// Candidates are the buffers with enough dead bytes.
#[test]
fn test_compaction_candidates_follow_dead_bytes() {
    let mut store = single_field_store();
    let mut entries = Vec::new();
    for n in 0..20 {
        entries.push(store.commit(0, &record(n)).unwrap());
    }
    assert!(store.compaction_candidates(0.1).is_empty());

    for (entry, bits) in &entries {
        store.relocate_known_length(*entry, *bits).unwrap();
    }
    // Every original range is dead: roughly half the buffer
    assert_eq!(store.compaction_candidates(0.4), vec![0]);
    assert!(store.compaction_candidates(0.6).is_empty());
}

/// Ids of released buffers are handed out again.
#[test]
fn test_released_buffer_ids_are_reused() {
    let mut store = DataStore::new();
    let type_id = store.add_type(BufferType::raw_bytes(64));
    store.init_active_buffers().unwrap();
    let handler = GenerationHandler::new();

    let mut seen = HashSet::new();
    for round in 0..5u8 {
        let entry = store.allocate_copy(type_id, &[round; 12]).unwrap();
        seen.insert(entry.buffer_id());

        let retired = store.start_compact(type_id).unwrap();
        store.allocate_copy(type_id, &[round; 12]).unwrap();
        store.finish_compact(&retired).unwrap();

        store.transfer_hold_lists(handler.current_generation());
        handler.increment_generation();
        store.trim_hold_lists(handler.oldest_used_generation());
    }
    // Two buffers alternate as active and retired
    assert_eq!(seen.len(), 2);
    assert_eq!(store.hold_bytes(), 0);
}

/// Guards taken on reader threads hold back trimming until joined.
#[test]
fn test_reader_threads_pin_generation() {
    let mut store = single_field_store();
    let handler = GenerationHandler::new();
    let (entry, _) = store.commit(0, &record(10)).unwrap();

    let guards: Vec<_> = (0..4)
        .map(|_| {
            let handler = handler.clone();
            thread::spawn(move || handler.take_guard()).join().unwrap()
        })
        .collect();
    assert_eq!(handler.guard_count(), 4);

    let retired = store.start_compact().unwrap();
    let moved = store.relocate(0, entry).unwrap();
    store.finish_compact(&retired).unwrap();
    store.transfer_hold_lists(handler.current_generation());
    handler.increment_generation();

    assert_eq!(store.trim_hold_lists(handler.oldest_used_generation()), 0);
    drop(guards);
    assert_eq!(store.trim_hold_lists(handler.oldest_used_generation()), 1);
    assert_eq!(store.get(0, moved).unwrap(), record(10));
}

/// Readers decode every live record on their own threads while the writer
/// keeps committing, relocating and trimming underneath them.
#[test]
fn test_readers_decode_during_compaction() {
    const LIVE: u32 = 24;
    const ROUNDS: u32 = 60;
    const READERS: usize = 4;

    let schema = IndexSchema::new(vec![IndexField::single("body").with_avg_elem_len(64)]);
    let config = FeatureStoreConfig {
        min_buffer_bytes: 256,
        ..Default::default()
    };
    let mut store = FeatureStore::new(&schema, &config).unwrap();
    let handler = GenerationHandler::new();

    let expected: Arc<Vec<DocFeatures>> = Arc::new((0..LIVE).map(record).collect());
    let refs: Arc<Vec<AtomicU32>> = Arc::new(
        expected
            .iter()
            .map(|rec| AtomicU32::new(store.commit(0, rec).unwrap().0.raw()))
            .collect(),
    );
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let reader = store.reader();
            let handler = handler.clone();
            let expected = Arc::clone(&expected);
            let refs = Arc::clone(&refs);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut passes = 0u64;
                loop {
                    let done = stop.load(Ordering::Acquire);
                    let guard = handler.take_guard();
                    for (slot, rec) in refs.iter().zip(expected.iter()) {
                        let entry = EntryRef::from_raw(slot.load(Ordering::Acquire));
                        assert_eq!(&reader.get(&guard, 0, entry).unwrap(), rec);
                        assert!(reader.bit_length(&guard, 0, entry).unwrap() > 0);
                    }
                    drop(guard);
                    passes += 1;
                    if done {
                        return passes;
                    }
                }
            })
        })
        .collect();

    for round in 0..ROUNDS {
        for n in 0..8 {
            let (entry, bits) = store.commit(0, &record(round + n)).unwrap();
            store.inc_dead(entry, bits);
        }

        let retired = store.start_compact().unwrap();
        for slot in refs.iter() {
            let moved = store.relocate(0, EntryRef::from_raw(slot.load(Ordering::Relaxed))).unwrap();
            slot.store(moved.raw(), Ordering::Release);
        }
        store.finish_compact(&retired).unwrap();

        store.transfer_hold_lists(handler.current_generation());
        handler.increment_generation();
        store.trim_hold_lists(handler.oldest_used_generation());
    }

    stop.store(true, Ordering::Release);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }

    assert_eq!(handler.guard_count(), 0);
    store.trim_hold_lists(handler.oldest_used_generation());
    assert_eq!(store.memory_usage().hold_bytes, 0);
    assert!(store.snapshot().buffers_freed >= u64::from(ROUNDS));
    for (slot, rec) in refs.iter().zip(expected.iter()) {
        assert_eq!(&store.get(0, EntryRef::from_raw(slot.load(Ordering::Relaxed))).unwrap(), rec);
    }
}

// =============================================================================
// Generation Ordering
// =============================================================================

/// Items advanced at g1 survive trim(g <= g1); trim(g > g2) releases both
/// batches in retirement order.
#[test]
fn test_generation_ordering() {
    let mut holder: GenerationHolder<Vec<u8>> = GenerationHolder::new();
    holder.hold(vec![1; 10]);
    holder.hold(vec![2; 20]);
    holder.advance(Generation::new(10));
    holder.hold(vec![3; 30]);
    holder.advance(Generation::new(20));
    let total = holder.held_bytes();

    for g in [0, 5, 10] {
        assert_eq!(holder.trim(Generation::new(g)), 0);
        assert_eq!(holder.held_bytes(), total);
    }

    let mut released = Vec::new();
    holder.trim_with(Generation::new(21), |bytes| released.push(bytes[0]));
    assert_eq!(released, vec![1, 2, 3]);
    assert_eq!(holder.held_bytes(), 0);
    assert!(holder.is_empty());
}

/// Ordering holds across counter wraparound.
#[test]
fn test_generation_ordering_across_wraparound() {
    let handler = GenerationHandler::starting_at(Generation::new(u64::MAX - 1));
    let mut holder: GenerationHolder<Vec<u8>> = GenerationHolder::new();

    holder.hold(vec![0; 8]);
    holder.advance(handler.current_generation());
    let guard = handler.take_guard();
    handler.increment_generation();
    handler.increment_generation();
    assert_eq!(handler.current_generation(), Generation::new(0));

    assert_eq!(holder.trim(handler.oldest_used_generation()), 0);
    drop(guard);
    assert_eq!(holder.trim(handler.oldest_used_generation()), 1);
}
