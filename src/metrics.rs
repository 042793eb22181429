use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated on every sketch operation.
pub struct StatsCounter {
    records: AtomicU64,
    layer_updates: AtomicU64,
    dropped_after_invalidate: AtomicU64,
    evaluations: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        StatsCounter {
            records: AtomicU64::new(0),
            layer_updates: AtomicU64::new(0),
            dropped_after_invalidate: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_ingest(&self, layers_touched: u64) {
        self.records.fetch_add(1, Ordering::Relaxed);
        self.layer_updates.fetch_add(layers_touched, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped_after_invalidate.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the statistics.
    pub fn snapshot(&self) -> SketchStats {
        let records = self.records.load(Ordering::Relaxed);
        let layer_updates = self.layer_updates.load(Ordering::Relaxed);
        SketchStats {
            records,
            layer_updates,
            dropped_after_invalidate: self.dropped_after_invalidate.load(Ordering::Relaxed),
            evaluations: self.evaluations.load(Ordering::Relaxed),
            mean_layers_per_record: if records == 0 {
                0.0
            } else {
                layer_updates as f64 / records as f64
            },
        }
    }
}

impl Default for StatsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of sketch statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchStats {
    /// Records accepted by `update`.
    pub records: u64,
    /// Substream updates across all layers (≥ `records`; the subsampling
    /// cascade touches ~2 layers per record in expectation).
    pub layer_updates: u64,
    /// Updates silently discarded because the sketch was invalidated.
    pub dropped_after_invalidate: u64,
    /// Completed `evaluate` calls.
    pub evaluations: u64,
    /// `layer_updates / records`, or `0.0` before the first record.
    pub mean_layers_per_record: f64,
}
