//! Core traits and the matrix-free dispatch layer.

pub mod matfree;
pub mod traits;

pub use matfree::MatFree;
pub use traits::{Indexing, MatVec};
