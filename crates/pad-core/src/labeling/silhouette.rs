//! Mean silhouette score for a 1-D partition.
//!
//! For a value `x` in cluster `A`:
//! - `a(x)`: mean distance to the other members of `A`
//! - `b(x)`: smallest mean distance to the members of any other cluster
//! - `s(x) = (b - a) / max(a, b)`, and `s(x) = 0` when `A` is a singleton
//!
//! Mean absolute distances are answered from sorted prefix sums, so the
//! score costs `O(n * c * log n)` rather than `O(n^2)`.

/// Sorted members of one cluster with prefix sums.
struct SortedCluster {
    values: Vec<f64>,
    prefix: Vec<f64>,
}

impl SortedCluster {
    fn new(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        let mut prefix = Vec::with_capacity(values.len() + 1);
        prefix.push(0.0);
        for v in &values {
            prefix.push(prefix[prefix.len() - 1] + v);
        }
        Self { values, prefix }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    /// Sum of `|x - y|` over every member `y`.
    fn abs_distance_sum(&self, x: f64) -> f64 {
        let m = self.values.len();
        let below = self.values.partition_point(|&v| v <= x);
        let sum_below = self.prefix[below];
        let sum_above = self.prefix[m] - sum_below;
        (x * below as f64 - sum_below) + (sum_above - x * (m - below) as f64)
    }
}

/// Mean silhouette over all values.
///
/// Returns `None` when fewer than two clusters are non-empty.
pub(crate) fn silhouette_score(values: &[f64], assignments: &[usize], cluster_count: usize) -> Option<f64> {
    let mut members: Vec<Vec<f64>> = vec![Vec::new(); cluster_count];
    for (&v, &a) in values.iter().zip(assignments) {
        members[a].push(v);
    }
    let clusters: Vec<Option<SortedCluster>> = members
        .into_iter()
        .map(|m| (!m.is_empty()).then(|| SortedCluster::new(m)))
        .collect();

    if clusters.iter().filter(|c| c.is_some()).count() < 2 {
        return None;
    }

    let total: f64 = values
        .iter()
        .zip(assignments)
        .map(|(&x, &own)| {
            let Some(home) = clusters[own].as_ref() else {
                return 0.0;
            };
            if home.len() < 2 {
                return 0.0;
            }
            let a = home.abs_distance_sum(x) / (home.len() - 1) as f64;
            let b = clusters
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != own)
                .filter_map(|(_, c)| c.as_ref())
                .map(|c| c.abs_distance_sum(x) / c.len() as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .sum();

    Some(total / values.len() as f64)
}
