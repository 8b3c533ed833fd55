//! Distance metrics for vector similarity search.

use std::fmt;

/// Supported distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity (vectors are normalized, then compared by IP).
    Cosine,
    /// Euclidean (L2 squared) distance.
    L2,
    /// Inner product (dot product).
    Ip,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::L2 => write!(f, "l2"),
            Self::Ip => write!(f, "ip"),
        }
    }
}

impl DistanceMetric {
    /// Tag byte used by the index file format.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Cosine => 0,
            Self::L2 => 1,
            Self::Ip => 2,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Cosine),
            1 => Some(Self::L2),
            2 => Some(Self::Ip),
            _ => None,
        }
    }

    /// True when smaller values mean nearer (L2); false for similarity metrics.
    pub fn lower_is_nearer(self) -> bool {
        matches!(self, Self::L2)
    }

    /// Metric-native value between two vectors. Cosine assumes both sides
    /// are already normalized.
    #[inline]
    pub fn measure(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => l2_squared(a, b),
            Self::Ip | Self::Cosine => inner_product(a, b),
        }
    }
}

/// Compute inner product (dot product) of two vectors.
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute L2 squared distance.
#[inline]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| {
        let d = x - y;
        d * d
    }).sum()
}

/// Normalize a vector in-place (L2 normalization).
pub fn normalize_vector(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_byte_roundtrip() {
        for m in [DistanceMetric::Cosine, DistanceMetric::L2, DistanceMetric::Ip] {
            assert_eq!(DistanceMetric::from_byte(m.to_byte()), Some(m));
        }
        assert_eq!(DistanceMetric::from_byte(9), None);
    }

    #[test]
    fn test_measure_l2_identical_is_zero() {
        let v = [0.5, -1.0, 2.0];
        assert_eq!(DistanceMetric::L2.measure(&v, &v), 0.0);
        assert!(DistanceMetric::L2.lower_is_nearer());
        assert!(!DistanceMetric::Ip.lower_is_nearer());
    }

    #[test]
    fn test_normalize_vector() {
        let mut v = vec![3.0, 4.0];
        normalize_vector(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize_vector(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
