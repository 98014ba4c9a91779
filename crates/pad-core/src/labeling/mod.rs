//! Automatic similarity labelling.
//!
//! The consumer never labels pairs by hand. Instead, the interest-statistic
//! distances of the sampled pairs are clustered in one dimension and the
//! cluster count with the best silhouette wins. Pairs falling in the
//! lowest-mean cluster are labelled similar; every other pair dissimilar.
//!
//! Too few distinct distances is a soft failure: the labeler returns no
//! labels and the pipeline retries with a larger sample.

mod kmeans;
mod silhouette;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PadError, PadResult};
use crate::types::SimilarityLabel;

/// Parameters for the silhouette-driven labeler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Smallest cluster count tried.
    pub min_clusters: usize,
    /// Exclusive upper bound on the cluster count.
    pub max_clusters: usize,
    /// Lloyd iterations per k-means run.
    pub max_iterations: usize,
    /// k-means restarts per cluster count.
    pub restarts: usize,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            min_clusters: 2,
            max_clusters: 8,
            max_iterations: 100,
            restarts: 4,
        }
    }
}

impl LabelingConfig {
    /// Validate parameters.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Config` when the cluster range is empty or a count
    /// is zero.
    pub fn validate(&self) -> PadResult<()> {
        if self.min_clusters < 2 {
            return Err(PadError::config(format!(
                "[labeling] min_clusters must be >= 2, got {}",
                self.min_clusters
            )));
        }
        if self.max_clusters <= self.min_clusters {
            return Err(PadError::config(format!(
                "[labeling] max_clusters ({}) must exceed min_clusters ({})",
                self.max_clusters, self.min_clusters
            )));
        }
        if self.max_iterations == 0 {
            return Err(PadError::config("[labeling] max_iterations must be > 0"));
        }
        if self.restarts == 0 {
            return Err(PadError::config("[labeling] restarts must be > 0"));
        }
        Ok(())
    }
}

/// The winning partition of one labelling call.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeling {
    /// One label per input distance.
    pub labels: Vec<SimilarityLabel>,
    /// Cluster count with the best silhouette.
    pub cluster_count: usize,
    /// Its mean silhouette.
    pub silhouette: f64,
}

impl Labeling {
    /// Number of pairs labelled similar.
    pub fn similar_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

/// Silhouette-driven similarity labeler.
#[derive(Debug, Clone, Default)]
pub struct SimilarityLabeler {
    config: LabelingConfig,
}

impl SimilarityLabeler {
    /// Create a labeler.
    pub fn new(config: LabelingConfig) -> Self {
        Self { config }
    }

    /// Cluster counts that can be tried for `distances`.
    pub fn candidate_counts(&self, distances: &[f64]) -> std::ops::RangeInclusive<usize> {
        let upper = (self.config.max_clusters.saturating_sub(1))
            .min(distinct_count(distances))
            .min(distances.len().saturating_sub(1));
        self.config.min_clusters..=upper
    }

    /// Label each pair distance; empty when no meaningful split exists.
    pub fn label(&self, distances: &[f64], seed: u64) -> Vec<SimilarityLabel> {
        self.analyze(distances, seed)
            .map(|l| l.labels)
            .unwrap_or_default()
    }

    /// Label each pair distance and report the winning partition.
    ///
    /// Returns `None` when fewer than two cluster counts are feasible or no
    /// partition separates the distances.
    pub fn analyze(&self, distances: &[f64], seed: u64) -> Option<Labeling> {
        let candidates = self.candidate_counts(distances);
        let feasible = candidates.clone().count();
        if feasible < 2 {
            warn!(
                samples = distances.len(),
                distinct = distinct_count(distances),
                feasible,
                "too few distinct pair distances to label similarity"
            );
            return None;
        }

        let mut best: Option<(usize, f64, kmeans::Partition)> = None;
        for c in candidates {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(c as u64));
            let partition = kmeans::fit(
                distances,
                c,
                self.config.max_iterations,
                self.config.restarts,
                &mut rng,
            );
            let Some(score) = silhouette::silhouette_score(distances, &partition.assignments, c) else {
                debug!(clusters = c, "partition collapsed to a single cluster");
                continue;
            };
            debug!(clusters = c, silhouette = score, inertia = partition.inertia, "candidate partition");
            // Strict improvement keeps the smaller count on ties.
            if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
                best = Some((c, score, partition));
            }
        }

        let (cluster_count, silhouette, partition) = best?;
        let means = partition.cluster_means(distances);
        let lowest = means
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let similar: Vec<bool> = means.iter().map(|m| *m == Some(lowest)).collect();
        let labels = partition
            .assignments
            .iter()
            .map(|&a| similar[a])
            .collect();

        let labeling = Labeling {
            labels,
            cluster_count,
            silhouette,
        };
        debug!(
            clusters = cluster_count,
            silhouette,
            similar = labeling.similar_count(),
            total = distances.len(),
            "labelled pairs"
        );
        Some(labeling)
    }
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| a.total_cmp(b).is_eq());
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_distances_give_empty_labels() {
        let labeler = SimilarityLabeler::default();
        assert!(labeler.label(&[2.5; 30], 1).is_empty());
        println!("[PASS] homogeneous distances -> empty labels");
    }

    #[test]
    fn test_two_distinct_values_are_not_enough() {
        // Only c = 2 is feasible.
        let labeler = SimilarityLabeler::default();
        let distances = [1.0, 1.0, 9.0, 9.0, 1.0];
        assert_eq!(labeler.candidate_counts(&distances), 2..=2);
        assert!(labeler.label(&distances, 0).is_empty());
    }

    #[test]
    fn test_candidate_range_is_capped() {
        let labeler = SimilarityLabeler::default();
        let distances: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(labeler.candidate_counts(&distances), 2..=7);
        assert_eq!(labeler.candidate_counts(&distances[..4]), 2..=3);
    }

    #[test]
    fn test_lowest_cluster_is_similar() {
        let distances = [0.1, 0.2, 0.15, 5.0, 5.1, 4.9, 20.0, 20.5, 19.8, 0.12];
        let labeling = SimilarityLabeler::default().analyze(&distances, 42).unwrap();

        assert_eq!(
            labeling.labels,
            vec![true, true, true, false, false, false, false, false, false, true]
        );
        assert_eq!(labeling.cluster_count, 3);
        assert!(labeling.silhouette > 0.8);
        assert_eq!(labeling.similar_count(), 4);
    }

    #[test]
    fn test_label_is_deterministic_per_seed() {
        let distances: Vec<f64> = (0..60).map(|i| ((i * 7919) % 97) as f64 / 3.0).collect();
        let labeler = SimilarityLabeler::default();
        assert_eq!(labeler.label(&distances, 9), labeler.label(&distances, 9));
    }

    #[test]
    fn test_config_validation() {
        assert!(LabelingConfig::default().validate().is_ok());
        let bad = LabelingConfig {
            min_clusters: 4,
            max_clusters: 4,
            ..Default::default()
        };
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("[labeling]"));
    }
}
