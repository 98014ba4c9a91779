//! Result of a publication run.

use serde::{Deserialize, Serialize};

use super::selection::CandidateLoss;
use crate::resample::ResamplePlan;
use crate::statistics::UtilityLoss;
use crate::types::{Dataset, RecordGroup};

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct Publication {
    /// Sanitized dataset: same keys, order and metadata as the input.
    pub dataset: Dataset,
    /// Utility loss against the input, per the configured interests.
    pub loss: UtilityLoss,
    /// Anonymity level requested in the configuration.
    pub requested_k: usize,
    /// Anonymity level actually enforced on the clustered records.
    pub effective_k: usize,
    /// Split applied when the input was too small, if any.
    pub resampled: Option<ResamplePlan>,
    /// Final partition. Indices refer to the clustered records: the input
    /// itself, or its blocks when resampled.
    pub groups: Vec<RecordGroup>,
    /// Member keys of each group, aligned with `groups`.
    pub group_keys: Vec<Vec<String>>,
    /// Name of the selected metric.
    pub metric: String,
    /// Evaluation outcome of every candidate learner.
    pub candidates: Vec<CandidateLoss>,
    /// Seed the run used.
    pub seed: u64,
    /// Labelling attempts made.
    pub labeling_attempts: usize,
}

impl Publication {
    /// Serializable summary without the dataset.
    pub fn report(&self) -> PublicationReport {
        PublicationReport {
            records: self.dataset.len(),
            requested_k: self.requested_k,
            effective_k: self.effective_k,
            resampled: self.resampled,
            metric: self.metric.clone(),
            loss: self.loss.clone(),
            candidates: self.candidates.clone(),
            group_count: self.groups.len(),
            smallest_group: self.groups.iter().map(RecordGroup::len).min().unwrap_or(0),
            seed: self.seed,
            labeling_attempts: self.labeling_attempts,
        }
    }
}

/// Summary of a run, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationReport {
    /// Published records.
    pub records: usize,
    /// Requested anonymity level.
    pub requested_k: usize,
    /// Enforced anonymity level.
    pub effective_k: usize,
    /// Resampling split, if applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resampled: Option<ResamplePlan>,
    /// Selected metric.
    pub metric: String,
    /// Utility loss.
    pub loss: UtilityLoss,
    /// Candidate outcomes.
    pub candidates: Vec<CandidateLoss>,
    /// Number of groups.
    pub group_count: usize,
    /// Size of the smallest group.
    pub smallest_group: usize,
    /// Run seed.
    pub seed: u64,
    /// Labelling attempts.
    pub labeling_attempts: usize,
}
