//! Exact nearest-neighbour index over fixed-dimension vectors.

mod codec;
mod flat;
mod traits;

pub use codec::{INDEX_FORMAT_VERSION, INDEX_MAGIC};
pub use flat::FlatIndex;
pub use traits::VectorIndex;

/// One search hit: a row position and its metric-native distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Search hits ordered nearest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub neighbors: Vec<Neighbor>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self { neighbors: vec![] }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn rows(&self) -> Vec<usize> {
        self.neighbors.iter().map(|n| n.row).collect()
    }
}
