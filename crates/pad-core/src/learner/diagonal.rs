//! Per-column weighted Euclidean learner.

use tracing::debug;

use crate::error::{PadError, PadResult};
use crate::metric::{DistanceMetric, WeightedEuclidean};
use crate::types::{RecordPair, SimilarityLabel};

use super::logistic::{fit_nonnegative, PairFeatures};
use super::{check_training_set, LearnerConfig, MetricLearner};

/// Learns one non-negative weight per column.
#[derive(Debug, Clone, Default)]
pub struct DiagonalMetricLearner {
    config: LearnerConfig,
}

impl DiagonalMetricLearner {
    /// Create the learner.
    pub fn new(config: LearnerConfig) -> Self {
        Self { config }
    }
}

impl MetricLearner for DiagonalMetricLearner {
    fn name(&self) -> &'static str {
        "diagonal"
    }

    fn train(
        &self,
        pairs: &[RecordPair],
        labels: &[SimilarityLabel],
    ) -> PadResult<Box<dyn DistanceMetric>> {
        let dimension = check_training_set(pairs, labels)?;
        let features = PairFeatures::from_pairs(pairs, dimension);
        let fitted = fit_nonnegative(&features.rows, labels, &self.config);
        let weights = features.unscale(&fitted);

        if weights.iter().all(|w| *w == 0.0) {
            return Err(PadError::insufficient_signal(
                "diagonal learner found no column separating similar from dissimilar pairs",
            ));
        }

        debug!(
            learner = self.name(),
            pairs = pairs.len(),
            active_columns = weights.iter().filter(|w| **w > 0.0).count(),
            dimension,
            "trained metric"
        );
        Ok(Box::new(WeightedEuclidean::new(self.name(), weights)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::test_support::column_zero_pairs;

    #[test]
    fn test_learns_informative_column() {
        let (pairs, labels) = column_zero_pairs(200, 4, 3);
        let metric = DiagonalMetricLearner::default().train(&pairs, &labels).unwrap();
        assert_eq!(metric.name(), "diagonal");

        // A class-sized shift in column 0 outweighs the full range of a noise column.
        let base = [0.5, 0.5, 0.5, 0.5];
        let d0 = metric.distance(&base, &[3.5, 0.5, 0.5, 0.5]);
        let d1 = metric.distance(&base, &[0.5, 1.5, 0.5, 0.5]);
        assert!(d0 > d1, "column 0 distance {} should exceed noise distance {}", d0, d1);
    }

    #[test]
    fn test_separates_training_classes() {
        let (pairs, labels) = column_zero_pairs(100, 3, 8);
        let metric = DiagonalMetricLearner::default().train(&pairs, &labels).unwrap();
        let scores = metric.score(&pairs);

        let max_similar = scores
            .iter()
            .zip(&labels)
            .filter(|(_, l)| **l)
            .map(|(s, _)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        let mean_dissimilar = scores
            .iter()
            .zip(&labels)
            .filter(|(_, l)| !**l)
            .map(|(s, _)| *s)
            .sum::<f64>()
            / labels.iter().filter(|l| !**l).count() as f64;
        assert!(mean_dissimilar > max_similar);
    }

    #[test]
    fn test_single_class_fails() {
        let (pairs, _) = column_zero_pairs(10, 2, 1);
        let labels = vec![false; 10];
        let err = DiagonalMetricLearner::default()
            .train(&pairs, &labels)
            .err()
            .unwrap();
        assert!(matches!(err, PadError::InsufficientSignal { .. }));
    }
}
