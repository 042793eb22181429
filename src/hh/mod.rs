//! Per-substream heavy-hitter tracking, in one of two modes.
//!
//! Exact mode keeps a bounded min-heap of the top-k candidates behind a
//! mutex; the lock is taken only for updates that already crossed the
//! heaviness threshold, which are rare by construction.  Approximate mode
//! is a lock-free table of k atomic slots.

pub mod approx;
pub mod exact;

use parking_lot::Mutex;

use crate::count_sketch::CountSketch;
use crate::counter::Counter;
use crate::hash::PairwiseHash;

pub use approx::{SlotTable, EMPTY_SLOT};
pub use exact::{HeapEntry, TopKHeap};

pub enum HeavyHitters<C: Counter> {
    Exact(Mutex<TopKHeap<C>>),
    Approx(SlotTable),
}

impl<C: Counter> HeavyHitters<C> {
    pub fn exact(k: usize) -> Self {
        HeavyHitters::Exact(Mutex::new(TopKHeap::new(k)))
    }

    pub fn approx(k: usize, slot_hash: PairwiseHash) -> Self {
        HeavyHitters::Approx(SlotTable::new(k, slot_hash))
    }

    /// Records that `key_hash` crossed the heaviness threshold with an
    /// estimated `count`.  `sketch` is consulted to re-estimate
    /// incumbents before they are displaced.
    pub fn observe(&self, key_hash: u64, count: C, sketch: &CountSketch<C>) {
        match self {
            HeavyHitters::Exact(heap) => {
                let mut heap = heap.lock();
                if heap.len() < heap.capacity() {
                    heap.remove_if_exists(key_hash);
                    heap.pushp(key_hash, count);
                    return;
                }
                // Full: displace the root only if its live estimate lost
                // to the candidate.
                let root = match heap.top() {
                    Some(entry) => entry.key_hash,
                    None => return,
                };
                if sketch.estimate(root) < count {
                    heap.pop();
                    heap.remove_if_exists(key_hash);
                    heap.pushp(key_hash, count);
                }
            }
            HeavyHitters::Approx(table) => {
                if table.is_empty() {
                    return;
                }
                let idx = table.slot_index(key_hash);
                let mut prev = table.load(idx);
                loop {
                    if prev == key_hash {
                        return;
                    }
                    let prev_count = if prev == EMPTY_SLOT {
                        C::ZERO
                    } else {
                        sketch.estimate(prev)
                    };
                    if prev_count > count {
                        return;
                    }
                    match table.try_replace(idx, prev, key_hash) {
                        Ok(()) => return,
                        Err(observed) => prev = observed,
                    }
                }
            }
        }
    }

    /// Point-in-time `(key_hash, count)` pairs.
    ///
    /// Exact mode returns the stored priorities (the estimate at each
    /// key's last qualifying update).  Approximate mode re-estimates each
    /// occupied slot's key against `sketch`, since slots carry no counts.
    pub fn entries(&self, sketch: &CountSketch<C>) -> Vec<(u64, C)> {
        match self {
            HeavyHitters::Exact(heap) => heap
                .lock()
                .iter()
                .map(|e| (e.key_hash, e.count))
                .collect(),
            HeavyHitters::Approx(table) => table
                .snapshot()
                .into_iter()
                .map(|key_hash| (key_hash, sketch.estimate(key_hash)))
                .collect(),
        }
    }

    pub fn storage_size(&self) -> usize {
        match self {
            HeavyHitters::Exact(heap) => heap.lock().storage_size(),
            HeavyHitters::Approx(table) => table.storage_size(),
        }
    }
}
