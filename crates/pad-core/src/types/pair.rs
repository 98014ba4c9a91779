//! Sampled record pairs and their similarity labels.

use serde::{Deserialize, Serialize};

/// Binary similarity judgement for one pair (`true` = similar).
pub type SimilarityLabel = bool;

/// An unordered pair of two distinct records.
///
/// Indices are normalized so that `left_index < right_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPair {
    /// Index of the first record.
    pub left_index: usize,
    /// Index of the second record.
    pub right_index: usize,
    /// Values of the first record.
    pub left: Vec<f64>,
    /// Values of the second record.
    pub right: Vec<f64>,
}

impl RecordPair {
    /// Create a pair, swapping sides when `a > b`.
    pub fn new(a: usize, b: usize, a_values: Vec<f64>, b_values: Vec<f64>) -> Self {
        if a <= b {
            Self {
                left_index: a,
                right_index: b,
                left: a_values,
                right: b_values,
            }
        } else {
            Self {
                left_index: b,
                right_index: a,
                left: b_values,
                right: a_values,
            }
        }
    }

    /// The `(left, right)` index pair.
    #[inline]
    pub fn indices(&self) -> (usize, usize) {
        (self.left_index, self.right_index)
    }
}
