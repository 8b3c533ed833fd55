//! Read-only vector index and its metadata sequence.
//!
//! Provides the exact (flat) nearest-neighbour index, its binary artifact
//! format, metadata decoding, artifact sources (local directory or HTTP) and
//! the `IndexStore` that loads and validates both artifacts together.

pub mod distance;
pub mod error;
pub mod index;
pub mod meta;
pub mod store;

pub use distance::DistanceMetric;
pub use error::{Result, VectorDbError};
pub use index::{FlatIndex, Neighbor, SearchResult, VectorIndex};
pub use store::{ArtifactSource, HttpSource, IndexStore, LocalDirSource};
