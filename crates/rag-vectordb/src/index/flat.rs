use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::distance::{self, DistanceMetric};
use crate::error::{Result, VectorDbError};
use super::{Neighbor, SearchResult, traits::VectorIndex};

/// Brute-force (flat) vector index.
/// Exact nearest-neighbor search by scanning all vectors. Immutable once
/// built; rows are stored contiguously in row-major order.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from row vectors. Cosine indexes store normalized rows.
    pub fn from_vectors(dimension: usize, metric: DistanceMetric, vectors: &[Vec<f32>]) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorDbError::Format("dimension must be positive".into()));
        }
        let mut data = Vec::with_capacity(dimension * vectors.len());
        for (row, v) in vectors.iter().enumerate() {
            if v.len() != dimension {
                return Err(VectorDbError::DimensionMismatch { expected: dimension, got: v.len() });
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(VectorDbError::Format(format!("row {row} contains non-finite values")));
            }
            data.extend_from_slice(v);
        }
        Self::from_raw(dimension, metric, data)
    }

    /// Build from an already-flattened row-major buffer.
    pub(crate) fn from_raw(dimension: usize, metric: DistanceMetric, mut data: Vec<f32>) -> Result<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(VectorDbError::Format(format!(
                "{} values do not divide into rows of {dimension}",
                data.len()
            )));
        }
        if metric == DistanceMetric::Cosine {
            for row in data.chunks_exact_mut(dimension) {
                distance::normalize_vector(row);
            }
        }
        Ok(Self { dimension, metric, data })
    }

    /// Stored vector at `row`.
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dimension).nth(row)
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], top_k: usize) -> Result<SearchResult> {
        if query.len() != self.dimension {
            return Err(VectorDbError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(VectorDbError::InvalidQuery("query vector contains non-finite values".into()));
        }
        if self.data.is_empty() || top_k == 0 {
            return Ok(SearchResult::empty());
        }

        let query_vec = if self.metric == DistanceMetric::Cosine {
            let mut q = query.to_vec();
            distance::normalize_vector(&mut q);
            q
        } else {
            query.to_vec()
        };

        let mut scored: Vec<Neighbor> = self.data.chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vec)| Neighbor { row, distance: self.metric.measure(&query_vec, vec) })
            .collect();

        // Stable: equal distances keep ascending row order.
        if self.metric.lower_is_nearer() {
            scored.sort_by_key(|n| OrderedFloat(n.distance));
        } else {
            scored.sort_by_key(|n| Reverse(OrderedFloat(n.distance)));
        }
        scored.truncate(top_k);

        Ok(SearchResult { neighbors: scored })
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
