use crate::distance::DistanceMetric;
use crate::error::Result;
use super::SearchResult;

/// Read-only nearest-neighbour index. Rows are addressed by their 0-based
/// position, which is also the position of their metadata record.
pub trait VectorIndex: Send + Sync {
    /// Search for the `top_k` nearest rows, nearest first. Returns fewer
    /// hits when the index holds fewer than `top_k` vectors.
    fn search(&self, query: &[f32], top_k: usize) -> Result<SearchResult>;

    /// Get the number of vectors in the index.
    fn len(&self) -> usize;

    /// Check if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the dimension of vectors in this index.
    fn dimension(&self) -> usize;

    /// Get the distance metric used.
    fn metric(&self) -> DistanceMetric;
}
