use core::fmt;

/// Errors returned by sketch constructors.
///
/// Steady-state operations (`update`, `estimate`, `evaluate`) are total and
/// never fail; everything that can go wrong is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SketchError {
    /// A constructor received an out-of-range argument.
    InvalidParameter(&'static str),
    /// The named column does not exist in the schema.
    UnknownColumn(String),
    /// The sketched column must have a fixed-width type; its byte width
    /// determines the number of subsampling layers.
    ColumnTypeMismatch(String),
}

impl fmt::Display for SketchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(message) => write!(f, "invalid parameter: {message}"),
            Self::UnknownColumn(name) => write!(f, "unknown column: {name}"),
            Self::ColumnTypeMismatch(name) => {
                write!(f, "column {name} is not a fixed-width type")
            }
        }
    }
}

impl std::error::Error for SketchError {}
