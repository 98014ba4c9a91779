//! Non-negative logistic regression on pair features.
//!
//! Model: `P(dissimilar | x) = sigmoid(w . x + b)` with `w >= 0`, where `x`
//! holds normalized squared column differences of a pair. A non-negative
//! `w` is exactly a weighted squared Euclidean distance, so the fitted
//! weights define the metric directly.

use crate::types::{RecordPair, SimilarityLabel};

use super::LearnerConfig;

/// Normalized squared differences of every pair.
#[derive(Debug, Clone)]
pub(crate) struct PairFeatures {
    /// One row per pair, one feature per column.
    pub rows: Vec<Vec<f64>>,
    /// Per-column mean of the raw squared differences; zero for constant
    /// columns.
    pub scale: Vec<f64>,
}

impl PairFeatures {
    pub fn from_pairs(pairs: &[RecordPair], dimension: usize) -> Self {
        let raw: Vec<Vec<f64>> = pairs
            .iter()
            .map(|p| {
                p.left
                    .iter()
                    .zip(&p.right)
                    .map(|(a, b)| (a - b).powi(2))
                    .collect()
            })
            .collect();

        let n = raw.len().max(1) as f64;
        let mut scale = vec![0.0; dimension];
        for row in &raw {
            for (s, v) in scale.iter_mut().zip(row) {
                *s += v;
            }
        }
        for s in &mut scale {
            *s /= n;
        }

        let rows = raw
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&scale)
                    .map(|(v, &s)| if s > 0.0 { v / s } else { 0.0 })
                    .collect()
            })
            .collect();

        Self { rows, scale }
    }

    /// Sum features over column groups: one feature per range.
    pub fn pooled(&self, ranges: &[std::ops::Range<usize>]) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| ranges.iter().map(|r| row[r.clone()].iter().sum()).collect())
            .collect()
    }

    /// Map weights on normalized features back to raw squared differences.
    pub fn unscale(&self, weights: &[f64]) -> Vec<f64> {
        weights
            .iter()
            .zip(&self.scale)
            .map(|(&w, &s)| if s > 0.0 { w / s } else { 0.0 })
            .collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Fit non-negative weights predicting "dissimilar".
///
/// Classes are re-weighted so that each contributes half of the loss.
/// Callers guarantee both classes are present.
pub(crate) fn fit_nonnegative(
    rows: &[Vec<f64>],
    labels: &[SimilarityLabel],
    config: &LearnerConfig,
) -> Vec<f64> {
    let n = rows.len();
    let features = rows.first().map_or(0, Vec::len);
    let similar = labels.iter().filter(|&&l| l).count();
    let dissimilar = n - similar;

    let class_weight = |is_similar: bool| {
        let count = if is_similar { similar } else { dissimilar };
        n as f64 / (2.0 * count.max(1) as f64)
    };

    let mut weights = vec![0.1; features];
    let mut bias = 0.0;
    for _ in 0..config.epochs {
        let mut grad_w = vec![0.0; features];
        let mut grad_b = 0.0;
        for (row, &is_similar) in rows.iter().zip(labels) {
            let z: f64 = bias + row.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>();
            let target = if is_similar { 0.0 } else { 1.0 };
            let err = class_weight(is_similar) * (sigmoid(z) - target);
            for (g, x) in grad_w.iter_mut().zip(row) {
                *g += err * x;
            }
            grad_b += err;
        }

        for (w, g) in weights.iter_mut().zip(&grad_w) {
            let step = g / n as f64 + config.l2 * *w;
            // Projection onto the non-negative orthant
            *w = (*w - config.learning_rate * step).max(0.0);
        }
        bias -= config.learning_rate * grad_b / n as f64;
    }

    weights
}
