//! Group representative aggregation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a group's members collapse into one published vector.
///
/// Aggregation is column-wise over the member vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepMode {
    /// Column mean.
    #[default]
    Mean,
    /// Column median (mean of the two middle values for even sizes).
    Median,
    /// Column maximum.
    Max,
    /// Column minimum.
    Min,
}

impl RepMode {
    /// Aggregate the vectors at `members` into one representative.
    ///
    /// `members` must be non-empty and every indexed vector must share one
    /// dimension; the engine validates both before calling.
    pub fn aggregate<V: AsRef<[f64]>>(&self, vectors: &[V], members: &[usize]) -> Vec<f64> {
        let Some(&first) = members.first() else {
            return Vec::new();
        };
        let dimension = vectors[first].as_ref().len();
        let count = members.len() as f64;

        match self {
            RepMode::Mean => {
                let mut sum = vec![0.0; dimension];
                for &m in members {
                    for (acc, v) in sum.iter_mut().zip(vectors[m].as_ref()) {
                        *acc += v;
                    }
                }
                sum.into_iter().map(|s| s / count).collect()
            }
            RepMode::Max => fold_columns(vectors, members, f64::NEG_INFINITY, f64::max),
            RepMode::Min => fold_columns(vectors, members, f64::INFINITY, f64::min),
            RepMode::Median => {
                let mut column = Vec::with_capacity(members.len());
                (0..dimension)
                    .map(|c| {
                        column.clear();
                        column.extend(members.iter().map(|&m| vectors[m].as_ref()[c]));
                        column.sort_by(f64::total_cmp);
                        let mid = column.len() / 2;
                        if column.len() % 2 == 0 {
                            (column[mid - 1] + column[mid]) / 2.0
                        } else {
                            column[mid]
                        }
                    })
                    .collect()
            }
        }
    }
}

impl fmt::Display for RepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepMode::Mean => "mean",
            RepMode::Median => "median",
            RepMode::Max => "max",
            RepMode::Min => "min",
        };
        f.write_str(name)
    }
}

impl FromStr for RepMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(RepMode::Mean),
            "median" => Ok(RepMode::Median),
            "max" => Ok(RepMode::Max),
            "min" => Ok(RepMode::Min),
            other => Err(format!(
                "unknown representative mode '{}' (expected mean, median, max or min)",
                other
            )),
        }
    }
}

fn fold_columns<V: AsRef<[f64]>>(
    vectors: &[V],
    members: &[usize],
    init: f64,
    op: fn(f64, f64) -> f64,
) -> Vec<f64> {
    let dimension = vectors[members[0]].as_ref().len();
    let mut acc = vec![init; dimension];
    for &m in members {
        for (a, v) in acc.iter_mut().zip(vectors[m].as_ref()) {
            *a = op(*a, *v);
        }
    }
    acc
}
