//! In-memory vector index over every stored chunk, rebuilt on demand.

pub mod cache;
pub mod snapshot;

pub use cache::{CacheState, VectorIndexCache};
pub use snapshot::{FlatIndex, VectorIndexSnapshot};
