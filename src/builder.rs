use std::marker::PhantomData;

use crate::count_sketch::CountSketch;
use crate::counter::Counter;
use crate::error::SketchError;
use crate::schema::Schema;
use crate::sketch::UniversalSketch;

/// Builder for configuring and constructing a [`UniversalSketch`].
///
/// # Example
/// ```
/// use unisketch::{ColumnType, Schema, SketchBuilder, UniversalSketch};
///
/// let schema = Schema::new(vec![("user_id", ColumnType::UInt64)]);
/// let sketch: UniversalSketch<i64> = SketchBuilder::new(0.125, 0.01, 16, 0.1)
///     .seed(42)
///     .build(&schema, "user_id")
///     .unwrap();
/// assert_eq!(sketch.num_layers(), 64);
/// ```
pub struct SketchBuilder<C: Counter = i64> {
    epsilon: f64,
    gamma: f64,
    k: usize,
    alpha: f64,
    precise: bool,
    seed: Option<u64>,
    dimensions: Option<(usize, usize, usize)>,
    _counter: PhantomData<C>,
}

impl<C: Counter> SketchBuilder<C> {
    /// Starts a builder from accuracy parameters: additive error
    /// `ε·‖f‖₂`, failure probability `γ`, `k` tracked heavy hitters per
    /// layer at threshold `α`.
    pub fn new(epsilon: f64, gamma: f64, k: usize, alpha: f64) -> Self {
        SketchBuilder {
            epsilon,
            gamma,
            k,
            alpha,
            precise: true,
            seed: None,
            dimensions: None,
            _counter: PhantomData,
        }
    }

    /// Selects the heavy-hitter tracker: `true` (default) for the exact
    /// bounded heap, `false` for the lock-free approximate slot table.
    pub fn precise(mut self, precise: bool) -> Self {
        self.precise = precise;
        self
    }

    /// Seeds every hash in the sketch deterministically.  Two sketches
    /// built with the same seed and fed the same stream in the same
    /// order hold identical state.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Overrides the derived `(layers, depth, width)` with explicit
    /// dimensions, ignoring `ε`/`γ` and the column byte width.
    pub fn dimensions(mut self, layers: usize, depth: usize, width: usize) -> Self {
        self.dimensions = Some((layers, depth, width));
        self
    }

    /// Builds the sketch over `column` of `schema`.
    pub fn build(self, schema: &Schema, column: &str) -> Result<UniversalSketch<C>, SketchError> {
        let (layers, depth, width) = match self.dimensions {
            Some(dims) => dims,
            None => {
                if !self.epsilon.is_finite() || self.epsilon <= 0.0 || self.epsilon >= 1.0 {
                    return Err(SketchError::InvalidParameter(
                        "epsilon must be finite and strictly between 0 and 1",
                    ));
                }
                if !self.gamma.is_finite() || self.gamma <= 0.0 || self.gamma >= 1.0 {
                    return Err(SketchError::InvalidParameter(
                        "gamma must be finite and strictly between 0 and 1",
                    ));
                }
                let col = schema.column(column)?;
                let key_width = col
                    .column_type()
                    .fixed_width()
                    .ok_or_else(|| SketchError::ColumnTypeMismatch(column.to_string()))?;
                (
                    8 * key_width,
                    CountSketch::<C>::perror_to_depth(self.gamma),
                    CountSketch::<C>::error_margin_to_width(self.epsilon),
                )
            }
        };
        UniversalSketch::with_seed(
            layers,
            depth,
            width,
            self.k,
            self.alpha,
            schema,
            column,
            self.precise,
            self.seed,
        )
    }
}
