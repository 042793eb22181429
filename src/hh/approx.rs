//! Lock-free approximate heavy-hitter table: k atomic slots, one candidate
//! key hash per slot.
//!
//! A key is hashed to a fixed slot; on a qualifying update it displaces
//! the incumbent via CAS if the incumbent's estimated count is not
//! higher.  A slot therefore converges to the most frequent key that maps
//! to it.  The table discards history on replacement — counts are always
//! re-read from the sketch at readout time.
//!
//! ## Sentinel
//!
//! An empty slot holds `EMPTY_SLOT` (all ones).  Key hashes fed to the
//! sketch have bit 63 cleared (see [`crate::sketch`]), so the sentinel is
//! unreachable by any real key and needs no tag bit.
//!
//! ## Known race
//!
//! Two threads may race a CAS on the same slot; the loser re-reads the
//! incumbent and retries, so a slot can flap between two hot keys while
//! their estimates are close.  Both candidates are heavy at that moment,
//! so either outcome is a correct summary.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::hash::PairwiseHash;

/// Marker for a slot that has never held a key.  Unreachable as a key
/// hash: real key hashes always have bit 63 cleared.
pub const EMPTY_SLOT: u64 = u64::MAX;

pub struct SlotTable {
    slots: Box<[AtomicU64]>,
    /// Maps a key hash to its home slot.
    slot_hash: PairwiseHash,
}

impl SlotTable {
    pub fn new(k: usize, slot_hash: PairwiseHash) -> Self {
        let slots = (0..k)
            .map(|_| AtomicU64::new(EMPTY_SLOT))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        SlotTable { slots, slot_hash }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Home slot for `key_hash`.
    #[inline]
    pub fn slot_index(&self, key_hash: u64) -> usize {
        (self.slot_hash.apply(key_hash) % self.slots.len() as u64) as usize
    }

    #[inline]
    pub fn load(&self, idx: usize) -> u64 {
        self.slots[idx].load(Ordering::Acquire)
    }

    /// Single CAS attempt `prev → next` on slot `idx`.  Returns the value
    /// observed on failure.
    #[inline]
    pub fn try_replace(&self, idx: usize, prev: u64, next: u64) -> Result<(), u64> {
        self.slots[idx]
            .compare_exchange(prev, next, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    /// All occupied slots' key hashes.
    pub fn snapshot(&self) -> Vec<u64> {
        self.slots
            .iter()
            .map(|s| s.load(Ordering::Acquire))
            .filter(|&h| h != EMPTY_SLOT)
            .collect()
    }

    pub fn storage_size(&self) -> usize {
        self.slots.len() * std::mem::size_of::<AtomicU64>()
            + std::mem::size_of::<PairwiseHash>()
    }
}
