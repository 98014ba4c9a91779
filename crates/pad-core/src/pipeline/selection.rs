//! Candidate metric selection.
//!
//! Every learner is trained on the same labelled pairs, its metric drives a
//! clustering of the evaluation subsample, and the realized utility loss is
//! the score. The lowest loss wins; ties go to the earlier candidate.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PadError, PadResult};
use crate::kward::KWard;
use crate::learner::MetricLearner;
use crate::metric::DistanceMetric;
use crate::types::{Dataset, RecordPair, SimilarityLabel};

use super::WorkingInterests;

/// Outcome of one candidate learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLoss {
    /// Learner name.
    pub learner: String,
    /// Aggregate loss on the evaluation subsample, if training succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,
    /// Why the candidate was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

/// The winning metric and the scores of all candidates.
pub struct Selection {
    /// Metric of the winning candidate.
    pub metric: Box<dyn DistanceMetric>,
    /// Index of the winner among the candidates.
    pub winner: usize,
    /// One entry per candidate, in registry order.
    pub candidates: Vec<CandidateLoss>,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("metric", &self.metric.name())
            .field("winner", &self.winner)
            .field("candidates", &self.candidates)
            .finish()
    }
}

/// Index of the smallest loss; the first one on ties.
pub fn argmin_loss(losses: &[f64]) -> Option<usize> {
    losses
        .iter()
        .enumerate()
        .min_by(|(i, a), (j, b)| a.total_cmp(b).then(i.cmp(j)))
        .map(|(i, _)| i)
}

/// Shared inputs of a selection round.
pub(crate) struct EvaluationContext<'a> {
    pub pairs: &'a [RecordPair],
    pub labels: &'a [SimilarityLabel],
    pub evaluation: &'a Dataset,
    /// Working row of each evaluation record.
    pub evaluation_rows: &'a [usize],
    pub engine: &'a KWard,
    pub interests: &'a WorkingInterests<'a>,
}

impl EvaluationContext<'_> {
    fn evaluate(&self, learner: &dyn MetricLearner) -> PadResult<(Box<dyn DistanceMetric>, f64)> {
        let metric = learner.train(self.pairs, self.labels)?;
        let sanitized = self.engine.sanitize(self.evaluation, metric.as_ref())?;
        let loss = self
            .interests
            .loss(self.evaluation_rows, self.evaluation, &sanitized.dataset)?;
        Ok((metric, loss.aggregate))
    }
}

/// Train, evaluate and pick the best candidate.
///
/// Candidates failing with `InsufficientSignal` are skipped; any other error
/// aborts the run. If every candidate is skipped the last such error is
/// returned.
pub(crate) fn select_metric(
    learners: &[Box<dyn MetricLearner>],
    context: &EvaluationContext<'_>,
    parallel: bool,
) -> PadResult<Selection> {
    let results: Vec<PadResult<(Box<dyn DistanceMetric>, f64)>> = if parallel {
        learners
            .par_iter()
            .map(|learner| context.evaluate(learner.as_ref()))
            .collect()
    } else {
        learners
            .iter()
            .map(|learner| context.evaluate(learner.as_ref()))
            .collect()
    };

    let mut candidates = Vec::with_capacity(learners.len());
    let mut trained: Vec<(usize, Box<dyn DistanceMetric>, f64)> = Vec::new();
    let mut last_skip: Option<PadError> = None;

    for (index, (learner, result)) in learners.iter().zip(results).enumerate() {
        match result {
            Ok((metric, loss)) => {
                info!(learner = learner.name(), loss, "candidate evaluated");
                candidates.push(CandidateLoss {
                    learner: learner.name().to_string(),
                    loss: Some(loss),
                    skipped: None,
                });
                trained.push((index, metric, loss));
            }
            Err(err @ PadError::InsufficientSignal { .. }) => {
                warn!(learner = learner.name(), error = %err, "candidate skipped");
                candidates.push(CandidateLoss {
                    learner: learner.name().to_string(),
                    loss: None,
                    skipped: Some(err.to_string()),
                });
                last_skip = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    let losses: Vec<f64> = trained.iter().map(|(_, _, loss)| *loss).collect();
    let Some(best) = argmin_loss(&losses) else {
        return Err(last_skip
            .unwrap_or_else(|| PadError::insufficient_signal("no metric learner is registered")));
    };
    let (winner, metric, loss) = trained.swap_remove(best);

    info!(
        learner = learners[winner].name(),
        loss,
        candidates = learners.len(),
        "selected metric"
    );
    Ok(Selection {
        metric,
        winner,
        candidates,
    })
}
