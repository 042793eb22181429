pub mod manager;
pub mod pairwise;

pub use manager::HashManager;
pub use pairwise::PairwiseHash;
