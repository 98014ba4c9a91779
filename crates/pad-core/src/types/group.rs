//! Groups produced by the clustering engine.

use serde::{Deserialize, Serialize};

use super::Dataset;

/// A set of records that publish one shared representative vector.
///
/// `members` holds dataset indices in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordGroup {
    /// Indices of the member records, ascending.
    pub members: Vec<usize>,

    /// Vector substituted for every member on publication.
    pub representative: Vec<f64>,
}

impl RecordGroup {
    /// Create a group; members are sorted.
    pub fn new(mut members: Vec<usize>, representative: Vec<f64>) -> Self {
        members.sort_unstable();
        Self {
            members,
            representative,
        }
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the group has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Keys of the members in `dataset`.
    pub fn keys<'a>(&self, dataset: &'a Dataset) -> Vec<&'a str> {
        self.members
            .iter()
            .map(|&i| dataset.records[i].key.as_str())
            .collect()
    }
}
