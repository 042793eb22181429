use rand::Rng;

/// 2⁶¹ − 1, the Mersenne prime used for modular reduction.
const MERSENNE_PRIME: u64 = (1 << 61) - 1;

/// A pairwise-independent hash over 64-bit integers.
///
/// `h(x) = (a·x + b) mod (2⁶¹ − 1)` with `a, b` drawn uniformly at
/// construction.  For any two distinct inputs the pair of outputs is
/// uniform over the square of the output range, which is all the
/// Count-Sketch error bounds require.
///
/// The struct is plain data: copyable, and fully deterministic given its
/// two coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairwiseHash {
    a: u64,
    b: u64,
}

impl PairwiseHash {
    /// Builds a hash from explicit coefficients.  `a` is forced non-zero
    /// so the map never degenerates to a constant.
    pub fn new(a: u64, b: u64) -> Self {
        let a = a % MERSENNE_PRIME;
        PairwiseHash {
            a: if a == 0 { 1 } else { a },
            b: b % MERSENNE_PRIME,
        }
    }

    /// Draws fresh uniform coefficients from `rng`.
    pub fn generate(rng: &mut impl Rng) -> Self {
        PairwiseHash::new(rng.gen(), rng.gen())
    }

    /// Applies the hash to `x`.
    #[inline]
    pub fn apply(&self, x: u64) -> u64 {
        let prod = u128::from(self.a) * u128::from(x) + u128::from(self.b);
        // Mersenne reduction: fold the high bits down twice, then one
        // conditional subtract covers the remaining overflow.
        let folded = (prod & u128::from(MERSENNE_PRIME)) + (prod >> 61);
        let folded = (folded & u128::from(MERSENNE_PRIME)) + (folded >> 61);
        let out = folded as u64;
        if out >= MERSENNE_PRIME {
            out - MERSENNE_PRIME
        } else {
            out
        }
    }

    /// The low bit of the hash, used as a subsampling coin flip.
    #[inline]
    pub fn parity(&self, x: u64) -> u64 {
        self.apply(x) & 1
    }
}
