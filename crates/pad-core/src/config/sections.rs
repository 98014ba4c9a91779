//! Configuration sections.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PadError, PadResult};
use crate::kward::{ClusteringBudget, RepMode};
use crate::metric::GenericMetric;
use crate::resample::DEFAULT_MIN_RESAMPLE_FACTOR;

/// `[anonymity]`: the privacy requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymitySection {
    /// Minimum group size of the published data.
    pub k: usize,
    /// Lower bound on the split factor when resampling.
    pub min_resample_factor: usize,
}

impl Default for AnonymitySection {
    fn default() -> Self {
        Self {
            k: 5,
            min_resample_factor: DEFAULT_MIN_RESAMPLE_FACTOR,
        }
    }
}

impl AnonymitySection {
    pub fn validate(&self) -> PadResult<()> {
        if self.k == 0 {
            return Err(PadError::config("[anonymity] k must be >= 1"));
        }
        if self.min_resample_factor == 0 {
            return Err(PadError::config(
                "[anonymity] min_resample_factor must be >= 1",
            ));
        }
        Ok(())
    }
}

/// `[clustering]`: the K-ward engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSection {
    /// Representative aggregator.
    pub rep_mode: RepMode,
    /// Metric for pre-sanitization.
    pub generic_metric: GenericMetric,
    /// Wall-clock limit per clustering call, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<u64>,
    /// Merge-step limit per clustering call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_merge_steps: Option<usize>,
}

impl ClusteringSection {
    pub fn validate(&self) -> PadResult<()> {
        if self.max_duration_secs == Some(0) {
            return Err(PadError::config(
                "[clustering] max_duration_secs must be > 0 when set",
            ));
        }
        Ok(())
    }

    /// Merge-loop limits.
    pub fn budget(&self) -> ClusteringBudget {
        ClusteringBudget {
            max_duration: self.max_duration_secs.map(Duration::from_secs),
            max_merge_steps: self.max_merge_steps,
        }
    }
}

/// `[sampling]`: pair sampling and the labelling retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSection {
    /// Fraction of records subsampled on the first attempt.
    pub initial_fraction: f64,
    /// Fraction added on every retry.
    pub fraction_step: f64,
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Upper bound on sampled pairs per attempt.
    pub max_pairs: usize,
    /// Run seed; drawn at random and logged when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            initial_fraction: 0.1,
            fraction_step: 0.1,
            max_retries: 5,
            max_pairs: 20_000,
            seed: None,
        }
    }
}

impl SamplingSection {
    pub fn validate(&self) -> PadResult<()> {
        if !(self.initial_fraction > 0.0 && self.initial_fraction <= 1.0) {
            return Err(PadError::config(format!(
                "[sampling] initial_fraction must be in (0, 1], got {}",
                self.initial_fraction
            )));
        }
        if !(self.fraction_step.is_finite() && self.fraction_step >= 0.0) {
            return Err(PadError::config(format!(
                "[sampling] fraction_step must be >= 0, got {}",
                self.fraction_step
            )));
        }
        if self.max_pairs == 0 {
            return Err(PadError::config("[sampling] max_pairs must be > 0"));
        }
        Ok(())
    }

    /// Sample fraction used by attempt `attempt` (0-based), capped at 1.
    pub fn fraction_for(&self, attempt: usize) -> f64 {
        (self.initial_fraction + self.fraction_step * attempt as f64).min(1.0)
    }
}

/// `[selection]`: candidate metric evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    /// Fraction of records clustered to score each candidate.
    pub evaluation_fraction: f64,
    /// Evaluate candidates on the rayon pool.
    pub parallel: bool,
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            evaluation_fraction: 0.1,
            parallel: true,
        }
    }
}

impl SelectionSection {
    pub fn validate(&self) -> PadResult<()> {
        if !(self.evaluation_fraction > 0.0 && self.evaluation_fraction <= 1.0) {
            return Err(PadError::config(format!(
                "[selection] evaluation_fraction must be in (0, 1], got {}",
                self.evaluation_fraction
            )));
        }
        Ok(())
    }
}
