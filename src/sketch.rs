//! The layered universal sketch.
//!
//! Layer 0 sees every key; each further layer subsamples the key universe
//! by an independent parity coin, so layer `i` holds an expected `2⁻ⁱ`
//! fraction of the keys.  Per-layer heavy hitters plus the geometric
//! halving are enough to estimate any G-sum `Σ g(fᵢ)` for non-negative
//! `g` with `g(0) = 0` — the per-layer sums are recombined from the
//! deepest layer outward with sign corrections and doubling.

use std::ops::{Add, Sub};
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::RandomState;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::count_sketch::CountSketch;
use crate::counter::Counter;
use crate::error::SketchError;
use crate::hash::HashManager;
use crate::metrics::{SketchStats, StatsCounter};
use crate::schema::{Record, Schema};
use crate::substream::SubstreamSummary;

/// Key hashes keep bit 63 clear so the approximate tracker's all-ones
/// empty sentinel can never collide with a real key.
const KEY_HASH_MASK: u64 = !(1 << 63);

/// A Count-Sketch–based universal sketch over one column of a record
/// stream.
///
/// Supports per-key frequency estimates, per-layer heavy-hitter sets,
/// and G-sum evaluation, all in sub-linear space.  `update` is safe to
/// call from many threads at once; `evaluate` and `estimate` are
/// best-effort readers.
pub struct UniversalSketch<C: Counter = i64> {
    layers: Box<[SubstreamSummary<C>]>,
    /// `layer_hashes[i]` decides whether a key advances from layer `i`
    /// to layer `i + 1`.
    layer_hashes: HashManager,
    /// Hashes record keys to the 64-bit key-hash space.
    build_hasher: RandomState,
    schema: Schema,
    column_index: usize,
    valid: AtomicBool,
    stats: StatsCounter,
}

impl<C: Counter> UniversalSketch<C> {
    /// Creates a sketch with explicit dimensions.
    ///
    /// `layers`, `depth`, `width`, and `k` must be positive and `alpha`
    /// must lie in `(0, 1]`; the sketched column must have a fixed-width
    /// type.
    pub fn new(
        layers: usize,
        depth: usize,
        width: usize,
        k: usize,
        alpha: f64,
        schema: &Schema,
        column: &str,
        precise: bool,
    ) -> Result<Self, SketchError> {
        Self::with_seed(layers, depth, width, k, alpha, schema, column, precise, None)
    }

    /// Creates a sketch from accuracy parameters: additive error
    /// `ε·‖f‖₂` with failure probability `γ`, `k` heavy hitters per
    /// layer at threshold `α`.  The layer count is one per bit of the
    /// column's key width.
    pub fn create_parameterized(
        epsilon: f64,
        gamma: f64,
        k: usize,
        alpha: f64,
        schema: &Schema,
        column: &str,
        precise: bool,
    ) -> Result<Self, SketchError> {
        if !epsilon.is_finite() || epsilon <= 0.0 || epsilon >= 1.0 {
            return Err(SketchError::InvalidParameter(
                "epsilon must be finite and strictly between 0 and 1",
            ));
        }
        if !gamma.is_finite() || gamma <= 0.0 || gamma >= 1.0 {
            return Err(SketchError::InvalidParameter(
                "gamma must be finite and strictly between 0 and 1",
            ));
        }
        let col = schema.column(column)?;
        let key_width = col
            .column_type()
            .fixed_width()
            .ok_or_else(|| SketchError::ColumnTypeMismatch(column.to_string()))?;
        Self::new(
            8 * key_width,
            CountSketch::<C>::perror_to_depth(gamma),
            CountSketch::<C>::error_margin_to_width(epsilon),
            k,
            alpha,
            schema,
            column,
            precise,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn with_seed(
        layers: usize,
        depth: usize,
        width: usize,
        k: usize,
        alpha: f64,
        schema: &Schema,
        column: &str,
        precise: bool,
        seed: Option<u64>,
    ) -> Result<Self, SketchError> {
        if layers == 0 {
            return Err(SketchError::InvalidParameter("layers must be positive"));
        }
        if depth == 0 {
            return Err(SketchError::InvalidParameter("depth must be positive"));
        }
        if width == 0 {
            return Err(SketchError::InvalidParameter("width must be positive"));
        }
        if k == 0 {
            return Err(SketchError::InvalidParameter("k must be positive"));
        }
        if !alpha.is_finite() || alpha <= 0.0 || alpha > 1.0 {
            return Err(SketchError::InvalidParameter(
                "alpha must lie in (0, 1]",
            ));
        }
        let col = schema.column(column)?;
        if col.column_type().fixed_width().is_none() {
            return Err(SketchError::ColumnTypeMismatch(column.to_string()));
        }
        let column_index = col.index();

        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let build_hasher =
            RandomState::with_seeds(rng.gen(), rng.gen(), rng.gen(), rng.gen());

        let substreams: Vec<SubstreamSummary<C>> = (0..layers)
            .map(|_| SubstreamSummary::new(depth, width, k, alpha, precise, &mut rng))
            .collect();

        let layer_hashes = HashManager::new(StdRng::seed_from_u64(rng.gen()));
        layer_hashes.guarantee_initialized(layers.saturating_sub(1));

        log::debug!(
            "universal sketch over column {column:?}: {layers} layers × ({depth}×{width}), \
             k={k}, alpha={alpha}, precise={precise}"
        );

        Ok(UniversalSketch {
            layers: substreams.into_boxed_slice(),
            layer_hashes,
            build_hasher,
            schema: schema.clone(),
            column_index,
            valid: AtomicBool::new(true),
            stats: StatsCounter::new(),
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// The schema this sketch was built against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Index of the sketched column within the schema.
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    /// The 64-bit hash under which `key` participates in this sketch.
    ///
    /// Heavy-hitter snapshots report key hashes, not keys; this is how a
    /// caller matches them back to candidate keys.  Bit 63 is always
    /// clear, keeping the approximate tracker's empty sentinel
    /// unreachable.
    #[inline]
    pub fn key_hash(&self, key: &[u8]) -> u64 {
        self.build_hasher.hash_one(key) & KEY_HASH_MASK
    }

    /// Ingests one record.
    ///
    /// Updates after [`invalidate`](Self::invalidate) are silently
    /// discarded.
    pub fn update(&self, record: &Record) {
        if !self.is_valid() {
            self.stats.record_dropped();
            return;
        }
        let key_hash = self.key_hash(record.column(self.column_index));

        self.layers[0].update(key_hash);
        let mut touched = 1u64;
        // A key reaches layer i only if every preceding coin came up 1,
        // so the walk stops at the first 0 parity.
        for i in 1..self.layers.len() {
            if self.layer_hashes.parity(i - 1, key_hash) != 1 {
                break;
            }
            self.layers[i].update(key_hash);
            touched += 1;
        }
        self.stats.record_ingest(touched);
    }

    /// Frequency estimate for `key`, read from layer 0.
    pub fn estimate(&self, key: &[u8]) -> C {
        self.layers[0].estimate(self.key_hash(key))
    }

    /// G-sum estimate `Σ g(fᵢ)` over all layers.
    pub fn evaluate<R, G>(&self, g: G) -> R
    where
        G: Fn(C) -> R,
        R: Copy + Default + Add<Output = R> + Sub<Output = R>,
    {
        self.evaluate_layers(g, self.layers.len())
    }

    /// G-sum estimate using only the innermost `nlayers` layers.
    ///
    /// The deepest layer's heavy hitters are summed unsigned; walking
    /// back out, each layer contributes with sign `+1` for keys that did
    /// not advance past it and `−1` for keys that did, and the running
    /// sum doubles once per layer to undo the expected halving.
    pub fn evaluate_layers<R, G>(&self, g: G, nlayers: usize) -> R
    where
        G: Fn(C) -> R,
        R: Copy + Default + Add<Output = R> + Sub<Output = R>,
    {
        assert!(
            nlayers >= 1 && nlayers <= self.layers.len(),
            "nlayers must lie in 1..={}",
            self.layers.len()
        );

        let last = nlayers - 1;
        let mut sum = R::default();
        for (_, count) in self.layers[last].heavy_hitters() {
            sum = sum + g(count);
        }

        for i in (0..last).rev() {
            let mut layer_sum = R::default();
            for (key_hash, count) in self.layers[i].heavy_hitters() {
                if self.layer_hashes.parity(i, key_hash) == 1 {
                    layer_sum = layer_sum - g(count);
                } else {
                    layer_sum = layer_sum + g(count);
                }
            }
            sum = sum + sum + layer_sum;
        }

        self.stats.record_evaluation();
        sum
    }

    /// Point-in-time heavy-hitter snapshot `(key_hash, count)` for one
    /// layer.  Snapshots are consistent per layer, not across layers.
    pub fn heavy_hitters(&self, layer: usize) -> Vec<(u64, C)> {
        self.layers[layer].heavy_hitters()
    }

    /// Total footprint across layers, in bytes.
    pub fn storage_size(&self) -> usize {
        self.layers
            .iter()
            .map(SubstreamSummary::storage_size)
            .sum::<usize>()
            + self.layer_hashes.storage_size()
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Retires the sketch.  Returns `true` for exactly one caller; every
    /// later call (and every `is_valid`) observes `false`.  In-flight
    /// updates are not interrupted.
    pub fn invalidate(&self) -> bool {
        let won = self
            .valid
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            log::debug!("universal sketch invalidated");
        }
        won
    }

    pub fn stats(&self) -> SketchStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn schema() -> Schema {
        Schema::new(vec![("key", ColumnType::UInt64)])
    }

    fn record(key: u64) -> Record {
        Record::new(vec![key.to_le_bytes().to_vec()])
    }

    fn make(precise: bool, seed: u64) -> UniversalSketch<i64> {
        UniversalSketch::with_seed(16, 5, 256, 16, 0.1, &schema(), "key", precise, Some(seed))
            .unwrap()
    }

    #[test]
    fn construction_rejects_bad_parameters() {
        let s = schema();
        assert!(UniversalSketch::<i64>::new(0, 5, 256, 16, 0.1, &s, "key", true).is_err());
        assert!(UniversalSketch::<i64>::new(16, 0, 256, 16, 0.1, &s, "key", true).is_err());
        assert!(UniversalSketch::<i64>::new(16, 5, 0, 16, 0.1, &s, "key", true).is_err());
        assert!(UniversalSketch::<i64>::new(16, 5, 256, 0, 0.1, &s, "key", true).is_err());
        assert!(UniversalSketch::<i64>::new(16, 5, 256, 16, 0.0, &s, "key", true).is_err());
        assert!(UniversalSketch::<i64>::new(16, 5, 256, 16, 1.5, &s, "key", true).is_err());
        assert!(UniversalSketch::<i64>::new(16, 5, 256, 16, 0.1, &s, "nope", true).is_err());
    }

    #[test]
    fn construction_rejects_var_width_column() {
        let s = Schema::new(vec![("blob", ColumnType::VarBytes)]);
        assert!(matches!(
            UniversalSketch::<i64>::new(16, 5, 256, 16, 0.1, &s, "blob", true),
            Err(SketchError::ColumnTypeMismatch(_))
        ));
    }

    #[test]
    fn parameterized_dimensions_follow_the_column_width() {
        let sketch = UniversalSketch::<i64>::create_parameterized(
            0.125,
            0.01,
            16,
            0.1,
            &schema(),
            "key",
            true,
        )
        .unwrap();
        assert_eq!(sketch.num_layers(), 64);
        assert!(sketch.storage_size() >= 64 * 5 * 174 * std::mem::size_of::<i64>());
    }

    #[test]
    fn empty_sketch_reads_zero() {
        let sketch = make(true, 42);
        assert_eq!(sketch.estimate(&7u64.to_le_bytes()), 0);
        assert_eq!(sketch.evaluate(|c| c), 0);
        assert!(sketch.storage_size() > 0);
        assert!(sketch.is_valid());
    }

    #[test]
    fn invalidate_is_one_shot() {
        let sketch = make(true, 42);
        assert!(sketch.invalidate());
        assert!(!sketch.invalidate());
        assert!(!sketch.is_valid());
    }

    #[test]
    fn updates_after_invalidate_are_dropped() {
        let sketch = make(true, 42);
        sketch.update(&record(1));
        sketch.invalidate();
        sketch.update(&record(1));
        sketch.update(&record(1));
        assert_eq!(sketch.estimate(&1u64.to_le_bytes()), 1);
        assert_eq!(sketch.stats().dropped_after_invalidate, 2);
    }

    #[test]
    fn layer_population_halves_geometrically() {
        let sketch = make(true, 42);
        for key in 0..4_096u64 {
            sketch.update(&record(key));
        }
        // ~2 layer updates per record in expectation; allow generous
        // slack around the mean.
        let mean = sketch.stats().mean_layers_per_record;
        assert!(
            (1.7..=2.3).contains(&mean),
            "mean layers per record = {mean}"
        );
    }

    #[test]
    fn stats_count_records_and_evaluations() {
        let sketch = make(true, 42);
        for _ in 0..10 {
            sketch.update(&record(3));
        }
        let _ = sketch.evaluate(|c| c);
        let snap = sketch.stats();
        assert_eq!(snap.records, 10);
        assert_eq!(snap.evaluations, 1);
        assert!(snap.layer_updates >= 10);
    }
}
