//! Weighted Euclidean learner with weights tied over column blocks.
//!
//! Fewer parameters than the diagonal learner; adjacent time slots share a
//! weight, which suits smooth profiles and small training sets.

use tracing::debug;

use crate::error::{PadError, PadResult};
use crate::metric::{DistanceMetric, WeightedEuclidean};
use crate::resample::block_ranges;
use crate::types::{RecordPair, SimilarityLabel};

use super::logistic::{fit_nonnegative, PairFeatures};
use super::{check_training_set, LearnerConfig, MetricLearner};

/// Learns one non-negative weight per contiguous block of columns.
#[derive(Debug, Clone, Default)]
pub struct BlockwiseMetricLearner {
    config: LearnerConfig,
}

impl BlockwiseMetricLearner {
    /// Create the learner.
    pub fn new(config: LearnerConfig) -> Self {
        Self { config }
    }
}

impl MetricLearner for BlockwiseMetricLearner {
    fn name(&self) -> &'static str {
        "blockwise"
    }

    fn train(
        &self,
        pairs: &[RecordPair],
        labels: &[SimilarityLabel],
    ) -> PadResult<Box<dyn DistanceMetric>> {
        let dimension = check_training_set(pairs, labels)?;
        let blocks = block_ranges(dimension, self.config.block_count.clamp(1, dimension.max(1)));
        let features = PairFeatures::from_pairs(pairs, dimension);
        let block_weights = fit_nonnegative(&features.pooled(&blocks), labels, &self.config);

        let mut column_weights = vec![0.0; dimension];
        for (range, &w) in blocks.iter().zip(&block_weights) {
            for c in range.clone() {
                column_weights[c] = w;
            }
        }
        let weights = features.unscale(&column_weights);

        if weights.iter().all(|w| *w == 0.0) {
            return Err(PadError::insufficient_signal(
                "blockwise learner found no block separating similar from dissimilar pairs",
            ));
        }

        debug!(
            learner = self.name(),
            pairs = pairs.len(),
            blocks = blocks.len(),
            active_blocks = block_weights.iter().filter(|w| **w > 0.0).count(),
            "trained metric"
        );
        Ok(Box::new(WeightedEuclidean::new(self.name(), weights)?))
    }
}
