//! The publication pipeline.
//!
//! [`Publisher::run`] sequences every component into one synchronous run:
//!
//! ```text
//! VERIFY → (RESAMPLE) → PRESANITIZE → SAMPLE_PAIRS → LABEL ─┐
//!                            ▲                              │ empty labels:
//!                            └──── larger sample fraction ──┘ retry (bounded)
//!       → TRAIN_METRIC (candidate loop) → FINAL_SANITIZE → (REASSEMBLE) → REPORT
//! ```
//!
//! Only the labelling step recovers locally. Every other failure propagates
//! as a typed error, and no dataset is returned unless every group holds at
//! least the effective `k` records.

mod report;
mod selection;
mod stage;

pub use report::{Publication, PublicationReport};
pub use selection::{argmin_loss, CandidateLoss, Selection};
pub use stage::PipelineStage;

use std::borrow::Cow;

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::PadConfig;
use crate::error::{PadError, PadResult};
use crate::kward::{kanonymity_level, verify_partition, KWard};
use crate::labeling::SimilarityLabeler;
use crate::learner::MetricLearner;
use crate::resample::{is_feasible, AnonymityResampler, BlockLayout, ResamplePlan};
use crate::sampling::{pair_count, PairSampler};
use crate::statistics::{BlockInterests, UtilityLoss};
use crate::types::{Dataset, InterestSet, RecordPair, SimilarityLabel};

use selection::{select_metric, EvaluationContext};

// Seed offsets keep the random streams of the stages independent.
const EVALUATION_STREAM: u64 = 0x5eed_e7a1;
const LABEL_STREAM: u64 = 0x1abe_1000;

/// Labelled pairs from the first successful attempt.
struct LabelledPairs {
    pairs: Vec<RecordPair>,
    labels: Vec<SimilarityLabel>,
    attempts: usize,
}

/// Interests as they apply to the rows being clustered.
pub(crate) enum WorkingInterests<'a> {
    /// Every row is a whole profile.
    Records(&'a InterestSet),
    /// Rows are blocks of split profiles.
    Blocks(BlockInterests),
}

impl WorkingInterests<'_> {
    /// Interests for the generic metric, which only sees vectors.
    fn metric_interests(&self) -> &InterestSet {
        match self {
            WorkingInterests::Records(interests) => *interests,
            WorkingInterests::Blocks(blocks) => blocks.merged(),
        }
    }

    fn pair_distance(&self, pair: &RecordPair) -> f64 {
        match self {
            WorkingInterests::Records(interests) => {
                interests.statistic_distance(&pair.left, &pair.right)
            }
            WorkingInterests::Blocks(blocks) => blocks.statistic_distance(
                pair.left_index,
                &pair.left,
                pair.right_index,
                &pair.right,
            ),
        }
    }

    /// Loss of `sanitized` against the working rows `rows`.
    pub(crate) fn loss(
        &self,
        rows: &[usize],
        original: &Dataset,
        sanitized: &Dataset,
    ) -> PadResult<UtilityLoss> {
        match self {
            WorkingInterests::Records(interests) => {
                interests.loss(&original.vectors(), &sanitized.vectors())
            }
            WorkingInterests::Blocks(blocks) => {
                blocks.loss(rows, &original.vectors(), &sanitized.vectors())
            }
        }
    }
}

/// Runs the publication pipeline for one configuration.
pub struct Publisher {
    config: PadConfig,
    learners: Vec<Box<dyn MetricLearner>>,
}

impl Publisher {
    /// Create a publisher with the learners named in `config.learner`.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Config` if the configuration is invalid.
    pub fn new(config: PadConfig) -> PadResult<Self> {
        config.validate()?;
        let learners = config.learner.build_candidates();
        Ok(Self { config, learners })
    }

    /// Replace the candidate learners.
    #[must_use]
    pub fn with_learners(mut self, learners: Vec<Box<dyn MetricLearner>>) -> Self {
        self.learners = learners;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &PadConfig {
        &self.config
    }

    /// Names of the candidate learners, in evaluation order.
    pub fn learner_names(&self) -> Vec<&'static str> {
        self.learners.iter().map(|l| l.name()).collect()
    }

    /// Sanitize `dataset`.
    ///
    /// # Errors
    ///
    /// - `PadError::Validation` for malformed input
    /// - `PadError::InsufficientData` when k-anonymity is unattainable
    /// - `PadError::RetryBudgetExceeded` when no attempt yields labels
    /// - `PadError::InsufficientSignal` when no candidate metric can be trained
    /// - `PadError::Timeout` when a clustering budget is exhausted
    pub fn run(&self, dataset: &Dataset) -> PadResult<Publication> {
        let config = &self.config;
        let requested_k = config.anonymity.k;

        // VERIFY
        let dimension = dataset.validate()?;
        let interests = config.interest_set()?;
        interests.validate(dimension)?;
        let seed = config.sampling.seed.unwrap_or_else(rand::random);
        info!(
            stage = %PipelineStage::Verify,
            records = dataset.len(),
            dimension,
            requested_k,
            interests = interests.specs().len(),
            seed,
            "input verified"
        );

        // RESAMPLE
        let resampler = AnonymityResampler::new(config.anonymity.min_resample_factor);
        let (working, working_interests, effective_k, plan, layout): (
            Cow<'_, Dataset>,
            WorkingInterests<'_>,
            usize,
            Option<ResamplePlan>,
            Option<BlockLayout>,
        ) = if is_feasible(dataset.len(), requested_k) {
            (
                Cow::Borrowed(dataset),
                WorkingInterests::Records(&interests),
                requested_k,
                None,
                None,
            )
        } else {
            let plan = resampler.plan_for(dataset.len(), dimension, requested_k, &interests)?;
            let (blocks, layout) = resampler.split(dataset, plan.factor)?;
            let block_interests = BlockInterests::new(&interests, &layout.ranges)?;
            info!(
                stage = %PipelineStage::Resample,
                pseudo_records = blocks.len(),
                block_width = plan.block_width,
                effective_k = plan.effective_k,
                "dataset resampled"
            );
            (
                Cow::Owned(blocks),
                WorkingInterests::Blocks(block_interests),
                plan.effective_k,
                Some(plan),
                Some(layout),
            )
        };

        let engine = KWard::new(effective_k, config.clustering.rep_mode)
            .with_budget(config.clustering.budget());

        // PRESANITIZE
        let generic = config
            .clustering
            .generic_metric
            .build(working_interests.metric_interests());
        let presanitized = engine.sanitize(&working, generic.as_ref())?;
        info!(
            stage = %PipelineStage::Presanitize,
            metric = generic.name(),
            groups = presanitized.groups.len(),
            "pre-sanitized with generic metric"
        );

        // SAMPLE_PAIRS + LABEL
        let labelled = self.label_pairs(&presanitized.dataset, &working_interests, seed)?;

        // TRAIN_METRIC
        let (evaluation_rows, evaluation) = evaluation_subset(
            &working,
            effective_k,
            config.selection.evaluation_fraction,
            seed,
        );
        info!(
            stage = %PipelineStage::TrainMetric,
            candidates = self.learners.len(),
            pairs = labelled.pairs.len(),
            evaluation_records = evaluation.len(),
            parallel = config.selection.parallel,
            "evaluating candidate metrics"
        );
        let context = EvaluationContext {
            pairs: &labelled.pairs,
            labels: &labelled.labels,
            evaluation: &evaluation,
            evaluation_rows: &evaluation_rows,
            engine: &engine,
            interests: &working_interests,
        };
        let selection = select_metric(&self.learners, &context, config.selection.parallel)?;

        // FINAL_SANITIZE
        let sanitized = engine.sanitize(&working, selection.metric.as_ref())?;
        verify_partition(&sanitized.groups, working.len(), effective_k)?;
        let level = kanonymity_level(&sanitized.dataset.vectors());
        if level < effective_k {
            return Err(PadError::insufficient_data(effective_k, level));
        }
        info!(
            stage = %PipelineStage::FinalSanitize,
            metric = selection.metric.name(),
            groups = sanitized.groups.len(),
            k_anonymity = level,
            "final sanitization complete"
        );

        let group_keys = sanitized
            .groups
            .iter()
            .map(|g| g.keys(&sanitized.dataset).into_iter().map(String::from).collect())
            .collect();

        // REASSEMBLE
        let output = match &layout {
            Some(layout) => {
                let restored = resampler.reassemble(dataset, &sanitized.dataset, layout)?;
                info!(
                    stage = %PipelineStage::Reassemble,
                    records = restored.len(),
                    "blocks reassembled"
                );
                restored
            }
            None => sanitized.dataset,
        };

        // REPORT
        let loss = interests.loss(&dataset.vectors(), &output.vectors())?;
        info!(
            stage = %PipelineStage::Report,
            loss = loss.aggregate,
            effective_k,
            requested_k,
            "publication complete"
        );

        Ok(Publication {
            dataset: output,
            loss,
            requested_k,
            effective_k,
            resampled: plan,
            groups: sanitized.groups,
            group_keys,
            metric: selection.metric.name().to_string(),
            candidates: selection.candidates,
            seed,
            labeling_attempts: labelled.attempts,
        })
    }

    /// Sample and label pairs, enlarging the sample until labels appear.
    fn label_pairs(
        &self,
        presanitized: &Dataset,
        interests: &WorkingInterests<'_>,
        seed: u64,
    ) -> PadResult<LabelledPairs> {
        let sampling = &self.config.sampling;
        let labeler = SimilarityLabeler::new(self.config.labeling.clone());
        let n = presanitized.len();
        let attempts = sampling.max_retries + 1;
        let mut fraction = sampling.fraction_for(0);

        for attempt in 0..attempts {
            fraction = sampling.fraction_for(attempt);
            let attempt_seed = seed.wrapping_add(attempt as u64);
            let size = ((n as f64 * fraction).round() as usize).max(2).min(n);

            let mut rng = ChaCha8Rng::seed_from_u64(attempt_seed);
            let mut rows = index::sample(&mut rng, n, size).into_vec();
            rows.sort_unstable();

            let vectors: Vec<&[f64]> = rows
                .iter()
                .map(|&r| presanitized.records[r].values.as_slice())
                .collect();
            let wanted = pair_count(size).min(sampling.max_pairs);
            let sample = PairSampler.sample(&vectors, wanted, attempt_seed)?;
            let pairs: Vec<RecordPair> = sample
                .pairs
                .into_iter()
                .map(|p| {
                    RecordPair::new(rows[p.left_index], rows[p.right_index], p.left, p.right)
                })
                .collect();
            debug!(
                stage = %PipelineStage::SamplePairs,
                attempt,
                fraction,
                subsample = size,
                pairs = pairs.len(),
                "sampled pairs"
            );

            let distances: Vec<f64> = pairs.iter().map(|p| interests.pair_distance(p)).collect();
            let labels = labeler.label(&distances, attempt_seed ^ LABEL_STREAM);
            if !labels.is_empty() {
                info!(
                    stage = %PipelineStage::Label,
                    attempt,
                    fraction,
                    pairs = pairs.len(),
                    similar = labels.iter().filter(|&&l| l).count(),
                    "pairs labelled"
                );
                return Ok(LabelledPairs {
                    pairs,
                    labels,
                    attempts: attempt + 1,
                });
            }
            warn!(
                stage = %PipelineStage::Label,
                attempt,
                fraction,
                "no similarity labels; retrying with a larger sample"
            );
        }

        Err(PadError::RetryBudgetExceeded {
            attempts,
            last_fraction: fraction,
        })
    }
}

/// Seeded subsample of `clamp(floor(n * fraction), k, n)` records, in
/// dataset order, with the rows they came from.
fn evaluation_subset(
    dataset: &Dataset,
    k: usize,
    fraction: f64,
    seed: u64,
) -> (Vec<usize>, Dataset) {
    let n = dataset.len();
    let size = ((n as f64 * fraction).floor() as usize).clamp(k.min(n), n);
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ EVALUATION_STREAM);
    let mut rows = index::sample(&mut rng, n, size).into_vec();
    rows.sort_unstable();
    let subset = dataset.subset(&rows);
    (rows, subset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_subset_size() {
        let dataset = Dataset::from_vectors((0..50).map(|i| vec![i as f64]).collect());
        assert_eq!(evaluation_subset(&dataset, 3, 0.1, 1).1.len(), 5);
        assert_eq!(evaluation_subset(&dataset, 8, 0.1, 1).1.len(), 8);
        assert_eq!(evaluation_subset(&dataset, 3, 1.0, 1).1.len(), 50);
    }

    #[test]
    fn test_evaluation_subset_keeps_order() {
        let dataset = Dataset::from_vectors((0..30).map(|i| vec![i as f64]).collect());
        let (rows, subset) = evaluation_subset(&dataset, 5, 0.5, 4);
        let keys: Vec<usize> = subset
            .keys()
            .iter()
            .map(|k| k.parse().unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(keys, rows);
    }

    #[test]
    fn test_publisher_rejects_invalid_config() {
        let mut config = PadConfig::default();
        config.anonymity.k = 0;
        assert!(matches!(Publisher::new(config), Err(PadError::Config { .. })));
    }
}
