mod builder;
mod count_sketch;
mod counter;
mod error;
mod metrics;
mod sketch;
mod substream;
pub mod hash;
pub mod hh;
pub mod schema;

pub use builder::SketchBuilder;
pub use count_sketch::CountSketch;
pub use counter::Counter;
pub use error::SketchError;
pub use metrics::SketchStats;
pub use schema::{Column, ColumnType, Record, Schema};
pub use sketch::UniversalSketch;
