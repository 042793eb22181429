//! One layer of the universal sketch: a Count-Sketch fused with a
//! heavy-hitter tracker and an online L2²-norm accumulator.

use rand::Rng;

use crate::count_sketch::CountSketch;
use crate::counter::Counter;
use crate::hash::PairwiseHash;
use crate::hh::HeavyHitters;

pub(crate) struct SubstreamSummary<C: Counter> {
    sketch: CountSketch<C>,
    heavy_hitters: HeavyHitters<C>,
    /// Running `Σ cᵢ²` over the estimates seen so far, maintained by the
    /// telescoping identity `(c+1)² − c² = 2c + 1`.
    l2_squared: C::Atomic,
    /// Heaviness threshold α: a key qualifies once its count reaches
    /// `α·‖f‖₂`.
    hh_threshold: f64,
}

impl<C: Counter> SubstreamSummary<C> {
    pub(crate) fn new(
        depth: usize,
        width: usize,
        k: usize,
        alpha: f64,
        precise: bool,
        rng: &mut impl Rng,
    ) -> Self {
        let sketch = CountSketch::new(depth, width, rng);
        let heavy_hitters = if precise {
            HeavyHitters::exact(k)
        } else {
            HeavyHitters::approx(k, PairwiseHash::generate(rng))
        };
        SubstreamSummary {
            sketch,
            heavy_hitters,
            l2_squared: C::new_atomic(),
            hh_threshold: alpha,
        }
    }

    /// Ingests one occurrence of `key_hash`.
    pub(crate) fn update(&self, key_hash: u64) {
        let c_old = self.sketch.update_and_estimate(key_hash);
        // (c+1)² − c² = 2c + 1
        let delta = c_old.wrapping_add(c_old).wrapping_add(C::ONE);
        let l2_sq_old = C::fetch_add(&self.l2_squared, delta);
        let l2 = l2_sq_old.wrapping_add(delta).as_f64().max(0.0).sqrt();

        let count = c_old.wrapping_add(C::ONE);
        if count.as_f64() < self.hh_threshold * l2 {
            return;
        }
        self.heavy_hitters.observe(key_hash, count, &self.sketch);
    }

    pub(crate) fn estimate(&self, key_hash: u64) -> C {
        self.sketch.estimate(key_hash)
    }

    /// Current `Σ cᵢ²` reading.  Non-decreasing for unit-increment
    /// streams within counter range.
    pub(crate) fn l2_squared(&self) -> C {
        C::load(&self.l2_squared)
    }

    /// Point-in-time heavy-hitter snapshot for this layer.
    pub(crate) fn heavy_hitters(&self) -> Vec<(u64, C)> {
        self.heavy_hitters.entries(&self.sketch)
    }

    pub(crate) fn storage_size(&self) -> usize {
        self.sketch.storage_size() + self.heavy_hitters.storage_size() + C::atomic_size()
    }
}
