//! One-dimensional k-means.
//!
//! Seeded k-means++ initialization followed by Lloyd iterations. The best
//! of several restarts (lowest inertia) is kept.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// A converged 1-D partition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Partition {
    /// Cluster index per value.
    pub assignments: Vec<usize>,
    /// Cluster centers.
    pub centroids: Vec<f64>,
    /// Sum of squared distances to the assigned centers.
    pub inertia: f64,
}

impl Partition {
    /// Mean value of each cluster; `None` for empty clusters.
    pub fn cluster_means(&self, values: &[f64]) -> Vec<Option<f64>> {
        let c = self.centroids.len();
        let mut sums = vec![0.0; c];
        let mut counts = vec![0usize; c];
        for (&v, &a) in values.iter().zip(&self.assignments) {
            sums[a] += v;
            counts[a] += 1;
        }
        sums.into_iter()
            .zip(counts)
            .map(|(s, n)| (n > 0).then(|| s / n as f64))
            .collect()
    }
}

/// Cluster `values` into `c` groups.
///
/// `values` must be non-empty and `c >= 1`.
pub(crate) fn fit(
    values: &[f64],
    c: usize,
    max_iterations: usize,
    restarts: usize,
    rng: &mut ChaCha8Rng,
) -> Partition {
    let mut best: Option<Partition> = None;
    for _ in 0..restarts.max(1) {
        let centroids = kmeans_plus_plus_init(values, c, rng);
        let candidate = lloyd(values, centroids, max_iterations);
        // Strict improvement keeps the earliest restart on ties.
        if best.as_ref().map_or(true, |b| candidate.inertia < b.inertia) {
            best = Some(candidate);
        }
    }
    best.unwrap_or_else(|| lloyd(values, vec![values[0]; c], max_iterations))
}

/// Choose initial centers with probability proportional to the squared
/// distance from the nearest center already chosen.
fn kmeans_plus_plus_init(values: &[f64], c: usize, rng: &mut ChaCha8Rng) -> Vec<f64> {
    let n = values.len();
    let mut centroids = Vec::with_capacity(c);
    centroids.push(values[rng.gen_range(0..n)]);

    let mut min_distances = vec![f64::INFINITY; n];
    while centroids.len() < c {
        let last = centroids[centroids.len() - 1];
        for (d, &v) in min_distances.iter_mut().zip(values) {
            *d = d.min((v - last).powi(2));
        }

        let total: f64 = min_distances.iter().sum();
        if total <= 0.0 {
            // Every value coincides with a center
            centroids.push(last);
            continue;
        }

        let mut target = rng.gen::<f64>() * total;
        let mut chosen = n - 1;
        for (i, &d) in min_distances.iter().enumerate() {
            if target < d {
                chosen = i;
                break;
            }
            target -= d;
        }
        centroids.push(values[chosen]);
    }

    centroids
}

fn nearest_centroid(value: f64, centroids: &[f64]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, &c) in centroids.iter().enumerate() {
        let d = (value - c).abs();
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}

fn lloyd(values: &[f64], mut centroids: Vec<f64>, max_iterations: usize) -> Partition {
    let c = centroids.len();
    let mut assignments: Vec<usize> = values
        .iter()
        .map(|&v| nearest_centroid(v, &centroids))
        .collect();

    for _ in 0..max_iterations {
        // Update step; empty clusters keep their center
        let mut sums = vec![0.0; c];
        let mut counts = vec![0usize; c];
        for (&v, &a) in values.iter().zip(&assignments) {
            sums[a] += v;
            counts[a] += 1;
        }
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
            if count > 0 {
                *centroid = sum / count as f64;
            }
        }

        let next: Vec<usize> = values
            .iter()
            .map(|&v| nearest_centroid(v, &centroids))
            .collect();
        if next == assignments {
            break;
        }
        assignments = next;
    }

    let inertia = values
        .iter()
        .zip(&assignments)
        .map(|(&v, &a)| (v - centroids[a]).powi(2))
        .sum();

    Partition {
        assignments,
        centroids,
        inertia,
    }
}
