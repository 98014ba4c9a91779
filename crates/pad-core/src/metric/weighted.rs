//! Per-dimension weighted Euclidean distance.
//!
//! Output of the reference metric learners: one non-negative weight per
//! column, `d(a, b) = sqrt(sum_i w_i * (a_i - b_i)^2)`.

use serde::{Deserialize, Serialize};

use super::DistanceMetric;
use crate::error::{PadError, PadResult};

/// Weighted Euclidean metric with non-negative weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEuclidean {
    name: String,
    weights: Vec<f64>,
}

impl WeightedEuclidean {
    /// Create the metric.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if a weight is negative or non-finite,
    /// or if every weight is zero.
    pub fn new(name: impl Into<String>, weights: Vec<f64>) -> PadResult<Self> {
        if let Some(pos) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
            return Err(PadError::validation(format!(
                "metric weight {} is {}, expected a finite value >= 0",
                pos, weights[pos]
            )));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(PadError::validation("metric weights are all zero"));
        }
        Ok(Self {
            name: name.into(),
            weights,
        })
    }

    /// The per-column weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl DistanceMetric for WeightedEuclidean {
    fn name(&self) -> &str {
        &self.name
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        if a.len() != b.len() || a.len() != self.weights.len() {
            return f64::INFINITY;
        }

        a.iter()
            .zip(b.iter())
            .zip(self.weights.iter())
            .map(|((x, y), w)| w * (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}
