use parking_lot::RwLock;
use rand::rngs::StdRng;

use super::pairwise::PairwiseHash;

/// A lazily grown, thread-safely initialised sequence of pairwise hashes.
///
/// Reads take the shared lock only; growth takes the exclusive lock for
/// the duration of appending the missing entries.  After
/// `guarantee_initialized(n)` returns, `hash(j, _)` for any `j < n` is a
/// pure read with no writer in sight.
pub struct HashManager {
    inner: RwLock<Inner>,
}

struct Inner {
    hashes: Vec<PairwiseHash>,
    /// Coefficient source for entries appended after construction.
    rng: StdRng,
}

impl HashManager {
    /// Creates an empty manager drawing coefficients from `rng`.
    pub fn new(rng: StdRng) -> Self {
        HashManager {
            inner: RwLock::new(Inner {
                hashes: Vec::new(),
                rng,
            }),
        }
    }

    /// Ensures the first `n` hashes exist.
    pub fn guarantee_initialized(&self, n: usize) {
        {
            let inner = self.inner.read();
            if inner.hashes.len() >= n {
                return;
            }
        }
        let mut inner = self.inner.write();
        while inner.hashes.len() < n {
            let h = PairwiseHash::generate(&mut inner.rng);
            inner.hashes.push(h);
        }
    }

    /// Applies the `i`-th hash to `x`, growing the sequence on demand.
    #[inline]
    pub fn hash(&self, i: usize, x: u64) -> u64 {
        {
            let inner = self.inner.read();
            if let Some(h) = inner.hashes.get(i) {
                return h.apply(x);
            }
        }
        self.guarantee_initialized(i + 1);
        self.inner.read().hashes[i].apply(x)
    }

    /// Low bit of the `i`-th hash of `x`.
    #[inline]
    pub fn parity(&self, i: usize, x: u64) -> u64 {
        self.hash(i, x) & 1
    }

    pub fn len(&self) -> usize {
        self.inner.read().hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seed metadata footprint in bytes.
    pub fn storage_size(&self) -> usize {
        self.len() * std::mem::size_of::<PairwiseHash>()
    }
}
