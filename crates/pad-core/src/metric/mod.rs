//! Distance metrics.
//!
//! A [`DistanceMetric`] scores the dissimilarity of two profile vectors.
//! The clustering engine is generic over this trait: a run uses a generic
//! metric for pre-sanitization and a learned metric for the final pass.
//!
//! # Contract
//!
//! - `distance(a, b) >= 0`
//! - `distance(a, b) == distance(b, a)`
//! - `distance(x, x) == 0`
//!
//! Non-finite results are treated as "infinitely far" by the engine.

mod distance;
mod interest;
mod weighted;

pub use distance::VectorMetric;
pub use interest::InterestDistance;
pub use weighted::WeightedEuclidean;

use serde::{Deserialize, Serialize};

use crate::types::{InterestSet, RecordPair};

/// Dissimilarity between two record vectors.
pub trait DistanceMetric: Send + Sync {
    /// Human-readable name used in logs and reports.
    fn name(&self) -> &str;

    /// Distance between `a` and `b`.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Score a batch of pairs (one distance per pair).
    fn score(&self, pairs: &[RecordPair]) -> Vec<f64> {
        pairs
            .iter()
            .map(|p| self.distance(&p.left, &p.right))
            .collect()
    }
}

/// Metric used before any metric has been learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenericMetric {
    /// Distance between the interest statistics of the two profiles.
    #[default]
    Interest,
    /// Plain Euclidean distance over all columns.
    Euclidean,
}

impl GenericMetric {
    /// Instantiate the metric for a run.
    pub fn build(&self, interests: &InterestSet) -> Box<dyn DistanceMetric> {
        match self {
            GenericMetric::Interest => Box::new(InterestDistance::new(interests.clone())),
            GenericMetric::Euclidean => Box::new(VectorMetric::Euclidean),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InterestSpec;

    #[test]
    fn test_generic_metric_default_is_interest() {
        assert_eq!(GenericMetric::default(), GenericMetric::Interest);
    }

    #[test]
    fn test_generic_metric_build() {
        let interests = InterestSet::single(InterestSpec::usage());
        let metric = GenericMetric::Euclidean.build(&interests);
        assert_eq!(metric.name(), "euclidean");
        let metric = GenericMetric::Interest.build(&interests);
        assert_eq!(metric.name(), "interest");
        // usage 3 vs 3
        assert_eq!(metric.distance(&[1.0, 2.0], &[2.0, 1.0]), 0.0);
    }

    #[test]
    fn test_default_score_uses_distance() {
        let pairs = vec![
            RecordPair::new(0, 1, vec![0.0, 0.0], vec![3.0, 4.0]),
            RecordPair::new(0, 2, vec![0.0, 0.0], vec![0.0, 0.0]),
        ];
        let scores = VectorMetric::Euclidean.score(&pairs);
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 5.0).abs() < 1e-12);
        assert_eq!(scores[1], 0.0);
    }
}
