//! Metric learners.
//!
//! A [`MetricLearner`] turns labelled pairs into a [`DistanceMetric`]. The
//! pipeline trains every registered learner, clusters an evaluation subsample
//! with each resulting metric and keeps the one with the lowest utility loss.
//!
//! Learners are listed in an explicit registry ([`LearnerKind`]); there is
//! no discovery at runtime.
//!
//! # Reference learners
//!
//! | Kind | Metric | Parameters |
//! |------|--------|------------|
//! | `diagonal` | weighted Euclidean | one weight per column |
//! | `blockwise` | weighted Euclidean | one weight per contiguous block of columns |
//!
//! Both fit a class-balanced logistic model of "dissimilar" on normalized
//! squared column differences, with weights constrained to be non-negative.

mod blockwise;
mod diagonal;
mod logistic;

pub use blockwise::BlockwiseMetricLearner;
pub use diagonal::DiagonalMetricLearner;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PadError, PadResult};
use crate::metric::DistanceMetric;
use crate::types::{RecordPair, SimilarityLabel};

/// Trains a distance metric from labelled pairs.
pub trait MetricLearner: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Fit a metric under which similar pairs are close and dissimilar
    /// pairs are far apart.
    ///
    /// # Errors
    ///
    /// - `PadError::Validation` if `labels` does not align with `pairs`
    /// - `PadError::InsufficientSignal` if the labels hold a single class or
    ///   the fit carries no information
    fn train(
        &self,
        pairs: &[RecordPair],
        labels: &[SimilarityLabel],
    ) -> PadResult<Box<dyn DistanceMetric>>;
}

/// Registry of available learners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnerKind {
    /// [`DiagonalMetricLearner`].
    Diagonal,
    /// [`BlockwiseMetricLearner`].
    Blockwise,
}

impl LearnerKind {
    /// Every registered learner, in evaluation order.
    pub fn all() -> &'static [LearnerKind] {
        &[LearnerKind::Diagonal, LearnerKind::Blockwise]
    }

    /// Instantiate the learner.
    pub fn build(&self, config: &LearnerConfig) -> Box<dyn MetricLearner> {
        match self {
            LearnerKind::Diagonal => Box::new(DiagonalMetricLearner::new(config.clone())),
            LearnerKind::Blockwise => Box::new(BlockwiseMetricLearner::new(config.clone())),
        }
    }

    /// Registry name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LearnerKind::Diagonal => "diagonal",
            LearnerKind::Blockwise => "blockwise",
        }
    }
}

impl fmt::Display for LearnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Training parameters shared by the reference learners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Full-batch gradient steps.
    pub epochs: usize,
    /// L2 penalty on the weights.
    pub l2: f64,
    /// Number of contiguous column blocks for `blockwise`.
    pub block_count: usize,
    /// Learners evaluated by the pipeline, in order.
    pub candidates: Vec<LearnerKind>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 200,
            l2: 1e-3,
            block_count: 4,
            candidates: LearnerKind::all().to_vec(),
        }
    }
}

impl LearnerConfig {
    /// Validate parameters.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Config` for non-positive rates, zero epochs or
    /// blocks, a negative penalty, or an empty candidate list.
    pub fn validate(&self) -> PadResult<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PadError::config(format!(
                "[learner] learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(PadError::config("[learner] epochs must be > 0"));
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err(PadError::config(format!(
                "[learner] l2 must be >= 0, got {}",
                self.l2
            )));
        }
        if self.block_count == 0 {
            return Err(PadError::config("[learner] block_count must be > 0"));
        }
        if self.candidates.is_empty() {
            return Err(PadError::config("[learner] candidates must not be empty"));
        }
        Ok(())
    }

    /// Instantiate every configured candidate.
    pub fn build_candidates(&self) -> Vec<Box<dyn MetricLearner>> {
        self.candidates.iter().map(|k| k.build(self)).collect()
    }
}

/// Check that labels align with pairs and hold both classes.
///
/// Returns the shared dimension of the pair vectors.
pub(crate) fn check_training_set(pairs: &[RecordPair], labels: &[SimilarityLabel]) -> PadResult<usize> {
    if pairs.len() != labels.len() {
        return Err(PadError::validation(format!(
            "{} labels for {} pairs",
            labels.len(),
            pairs.len()
        )));
    }
    let Some(first) = pairs.first() else {
        return Err(PadError::insufficient_signal("no labelled pairs"));
    };
    let dimension = first.left.len();
    if let Some(pos) = pairs
        .iter()
        .position(|p| p.left.len() != dimension || p.right.len() != dimension)
    {
        return Err(PadError::validation(format!(
            "pair {} does not match dimension {}",
            pos, dimension
        )));
    }

    let similar = labels.iter().filter(|&&l| l).count();
    if similar == 0 || similar == labels.len() {
        return Err(PadError::insufficient_signal(format!(
            "labels contain a single class ({} of {} similar)",
            similar,
            labels.len()
        )));
    }
    Ok(dimension)
}

#[cfg(test)]
pub(crate) mod test_support {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::types::RecordPair;

    /// Pairs whose label depends only on column 0: similar when the column-0
    /// difference is small. Other columns are noise.
    pub fn column_zero_pairs(count: usize, dimension: usize, seed: u64) -> (Vec<RecordPair>, Vec<bool>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut pairs = Vec::with_capacity(count);
        let mut labels = Vec::with_capacity(count);
        for i in 0..count {
            let similar = i % 2 == 0;
            let left: Vec<f64> = (0..dimension).map(|_| rng.gen_range(0.0..1.0)).collect();
            let mut right: Vec<f64> = (0..dimension).map(|_| rng.gen_range(0.0..1.0)).collect();
            right[0] = if similar {
                left[0] + rng.gen_range(-0.05..0.05)
            } else {
                left[0] + 3.0 + rng.gen_range(0.0..1.0)
            };
            pairs.push(RecordPair::new(2 * i, 2 * i + 1, left, right));
            labels.push(similar);
        }
        (pairs, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order() {
        assert_eq!(
            LearnerKind::all(),
            &[LearnerKind::Diagonal, LearnerKind::Blockwise]
        );
        let config = LearnerConfig::default();
        let names: Vec<&str> = config.build_candidates().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["diagonal", "blockwise"]);
    }

    #[test]
    fn test_single_class_is_insufficient_signal() {
        let pairs = vec![
            RecordPair::new(0, 1, vec![0.0], vec![1.0]),
            RecordPair::new(0, 2, vec![0.0], vec![2.0]),
        ];
        let err = check_training_set(&pairs, &[true, true]).unwrap_err();
        assert!(matches!(err, PadError::InsufficientSignal { .. }));
    }

    #[test]
    fn test_misaligned_labels() {
        let pairs = vec![RecordPair::new(0, 1, vec![0.0], vec![1.0])];
        let err = check_training_set(&pairs, &[true, false]).unwrap_err();
        assert!(matches!(err, PadError::Validation { .. }));
    }

    #[test]
    fn test_config_validation() {
        assert!(LearnerConfig::default().validate().is_ok());
        let bad = LearnerConfig {
            candidates: vec![],
            ..Default::default()
        };
        assert!(bad.validate().unwrap_err().to_string().contains("[learner]"));
        let bad = LearnerConfig {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_kind_serde() {
        let kinds: Vec<LearnerKind> = serde_json::from_str(r#"["blockwise","diagonal"]"#).unwrap();
        assert_eq!(kinds, vec![LearnerKind::Blockwise, LearnerKind::Diagonal]);
    }
}
