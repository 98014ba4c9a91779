//! Plain vector distances.
//!
//! Provides the non-learned metrics usable for pre-sanitization and tests.

use serde::{Deserialize, Serialize};

use super::DistanceMetric;

/// Vector distance without learned parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// Euclidean (L2) distance.
    #[default]
    Euclidean,
    /// Manhattan (L1) distance.
    /// More robust to outliers.
    Manhattan,
    /// Cosine distance: 1 - cosine_similarity.
    /// Ignores profile magnitude.
    Cosine,
}

impl DistanceMetric for VectorMetric {
    fn name(&self) -> &str {
        match self {
            VectorMetric::Euclidean => "euclidean",
            VectorMetric::Manhattan => "manhattan",
            VectorMetric::Cosine => "cosine",
        }
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            VectorMetric::Euclidean => euclidean_distance(a, b),
            VectorMetric::Manhattan => manhattan_distance(a, b),
            VectorMetric::Cosine => cosine_distance(a, b),
        }
    }
}

/// Compute vector magnitude (L2 norm).
pub(crate) fn magnitude(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Compute Euclidean (L2) distance between two vectors.
///
/// Vectors of different length are infinitely far apart.
pub(crate) fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Compute Manhattan (L1) distance between two vectors.
pub(crate) fn manhattan_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }

    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Compute cosine distance between two vectors.
///
/// Range: [0, 2]. Two zero vectors are identical (distance 0); a zero
/// vector against a non-zero one is at distance 1.
pub(crate) fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }

    let mag_a = magnitude(a);
    let mag_b = magnitude(b);

    if mag_a < 1e-12 || mag_b < 1e-12 {
        return if mag_a < 1e-12 && mag_b < 1e-12 { 0.0 } else { 1.0 };
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();

    // Clamp similarity first to absorb floating point error
    let similarity = (dot / (mag_a * mag_b)).clamp(-1.0, 1.0);
    (1.0 - similarity).clamp(0.0, 2.0)
}
