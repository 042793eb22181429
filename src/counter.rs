//! Counter abstraction over signed machine integers.
//!
//! The sketch only ever needs `+`, negation, comparison, and atomic
//! fetch-add on its counters, so any signed integer with a native atomic
//! works.  All arithmetic is wrap-around; sizing the counter for the
//! expected stream length is the caller's responsibility.

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
}

/// A signed counter type usable as sketch cell storage.
///
/// Implemented for `i32` and `i64`.  The trait is sealed: the atomic
/// mapping below is the whole point, and there is exactly one correct
/// mapping per primitive.
pub trait Counter:
    sealed::Sealed + Copy + Ord + Default + Send + Sync + fmt::Debug + 'static
{
    /// The matching native atomic (`AtomicI32` for `i32`, …).
    type Atomic: Send + Sync;

    const ZERO: Self;
    const ONE: Self;

    fn new_atomic() -> Self::Atomic;

    /// Atomic load, `Relaxed`.  Per-cell linearisability is all the
    /// estimator needs; readers tolerate torn medians across cells.
    fn load(cell: &Self::Atomic) -> Self;

    /// Atomic fetch-add, `Relaxed`.  Returns the previous value.
    fn fetch_add(cell: &Self::Atomic, delta: Self) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_neg(self) -> Self;

    /// Lossy view for threshold comparisons against `α·‖f‖₂`.
    fn as_f64(self) -> f64;

    fn atomic_size() -> usize {
        std::mem::size_of::<Self::Atomic>()
    }
}

macro_rules! impl_counter {
    ($int:ty, $atomic:ty) => {
        impl Counter for $int {
            type Atomic = $atomic;

            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline]
            fn new_atomic() -> Self::Atomic {
                <$atomic>::new(0)
            }

            #[inline]
            fn load(cell: &Self::Atomic) -> Self {
                cell.load(Ordering::Relaxed)
            }

            #[inline]
            fn fetch_add(cell: &Self::Atomic, delta: Self) -> Self {
                cell.fetch_add(delta, Ordering::Relaxed)
            }

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$int>::wrapping_add(self, rhs)
            }

            #[inline]
            fn wrapping_neg(self) -> Self {
                <$int>::wrapping_neg(self)
            }

            #[inline]
            fn as_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_counter!(i32, AtomicI32);
impl_counter!(i64, AtomicI64);
