//! Count-Sketch: an unbiased frequency estimator over a d×w matrix of
//! signed atomic counters.
//!
//! Each of the `d` rows hashes a key to one of `w` buckets and to a sign
//! in `{−1, +1}`.  An update adds the signed increment to one cell per
//! row; a point query returns the median of the per-row sign-adjusted
//! cell values.  Collisions cancel in expectation because colliding keys
//! carry independent signs.
//!
//! All cells are atomics, so concurrent writers only contend on the
//! hardware fetch-add.  Readers may observe a torn median while writers
//! are active; the estimator's error bound already absorbs per-row
//! fluctuation of that order.

use rand::Rng;

use crate::counter::Counter;
use crate::hash::PairwiseHash;

pub struct CountSketch<C: Counter> {
    depth: usize,
    width: usize,
    /// Row-major `depth × width` cell matrix.
    table: Box<[C::Atomic]>,
    /// One bucket-selection hash per row.
    bucket_hashes: Vec<PairwiseHash>,
    /// One sign hash per row; the low bit picks the sign.
    sign_hashes: Vec<PairwiseHash>,
}

impl<C: Counter> CountSketch<C> {
    /// Allocates a `depth × width` sketch with hashes drawn from `rng`.
    ///
    /// Dimensions must be positive; the builder validates them before
    /// calling in.
    pub fn new(depth: usize, width: usize, rng: &mut impl Rng) -> Self {
        debug_assert!(depth > 0 && width > 0);
        let table = (0..depth * width)
            .map(|_| C::new_atomic())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let bucket_hashes = (0..depth).map(|_| PairwiseHash::generate(rng)).collect();
        let sign_hashes = (0..depth).map(|_| PairwiseHash::generate(rng)).collect();
        CountSketch {
            depth,
            width,
            table,
            bucket_hashes,
            sign_hashes,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Width needed for additive error `ε·‖f‖₂`: `⌈e/ε²⌉`.
    pub fn error_margin_to_width(epsilon: f64) -> usize {
        (std::f64::consts::E / (epsilon * epsilon)).ceil() as usize
    }

    /// Depth needed for failure probability `γ`: `⌈ln(1/γ)⌉`.
    pub fn perror_to_depth(gamma: f64) -> usize {
        (1.0 / gamma).ln().ceil() as usize
    }

    #[inline]
    fn cell(&self, row: usize, key_hash: u64) -> &C::Atomic {
        let col = (self.bucket_hashes[row].apply(key_hash) % self.width as u64) as usize;
        &self.table[row * self.width + col]
    }

    /// `+1` when the row's sign bit is set, `−1` otherwise, folded into
    /// the delta.
    #[inline]
    fn signed(&self, row: usize, key_hash: u64, value: C) -> C {
        if self.sign_hashes[row].parity(key_hash) == 1 {
            value
        } else {
            value.wrapping_neg()
        }
    }

    /// Adds `delta` occurrences of `key_hash` to every row.
    pub fn update(&self, key_hash: u64, delta: C) {
        for row in 0..self.depth {
            C::fetch_add(self.cell(row, key_hash), self.signed(row, key_hash, delta));
        }
    }

    /// Adds one occurrence and returns the estimate as of just before
    /// this ingest.
    ///
    /// Each row's fetch-add yields the cell's prior value, so the median
    /// is taken over pre-update readings without a separate query pass.
    pub fn update_and_estimate(&self, key_hash: u64) -> C {
        let mut readings = Vec::with_capacity(self.depth);
        for row in 0..self.depth {
            let delta = self.signed(row, key_hash, C::ONE);
            let before = C::fetch_add(self.cell(row, key_hash), delta);
            readings.push(self.signed(row, key_hash, before));
        }
        median(readings)
    }

    /// Median-of-rows point estimate for `key_hash`.
    pub fn estimate(&self, key_hash: u64) -> C {
        let readings = (0..self.depth)
            .map(|row| self.signed(row, key_hash, C::load(self.cell(row, key_hash))))
            .collect();
        median(readings)
    }

    /// Cell matrix plus hash-seed metadata, in bytes.
    pub fn storage_size(&self) -> usize {
        self.table.len() * C::atomic_size()
            + (self.bucket_hashes.len() + self.sign_hashes.len())
                * std::mem::size_of::<PairwiseHash>()
    }
}

fn median<C: Counter>(mut readings: Vec<C>) -> C {
    readings.sort_unstable();
    readings[readings.len() / 2]
}
