//! Unbiased pair sampling.
//!
//! Draws `m` distinct unordered pairs of distinct records, uniformly over all
//! `C(n, 2)` pairs. Pairs are addressed by their rank in the lexicographic
//! order `(0,1), (0,2), .., (0,n-1), (1,2), ..`; distinct ranks are sampled
//! without replacement and unranked, so the full pair list is never built.

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::{PadError, PadResult};
use crate::types::RecordPair;

/// Number of unordered pairs of distinct items among `n`.
#[inline]
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Pairs whose first index is below `i`.
#[inline]
fn offset(n: usize, i: usize) -> usize {
    i * (2 * n - i - 1) / 2
}

/// The pair at lexicographic `rank` among all pairs of `n` items.
///
/// `rank` must be below `pair_count(n)`.
pub fn unrank_pair(n: usize, rank: usize) -> (usize, usize) {
    // Largest i in [0, n-2] with offset(i) <= rank.
    let (mut lo, mut hi) = (0, n.saturating_sub(2));
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if offset(n, mid) <= rank {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let i = lo;
    (i, i + 1 + (rank - offset(n, i)))
}

/// Sampled pairs with their index pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSample {
    /// Pairs carrying record values.
    pub pairs: Vec<RecordPair>,
    /// `(i, j)` with `i < j`, aligned with `pairs`.
    pub index_pairs: Vec<(usize, usize)>,
}

impl PairSample {
    /// Number of sampled pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no pair was sampled.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Draws pair samples with a seeded ChaCha8 generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairSampler;

impl PairSampler {
    /// Sample `m` distinct pairs from `vectors`.
    ///
    /// Pairs are returned in ascending rank order. The same seed always
    /// yields the same sample.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if `m` exceeds `C(n, 2)`.
    pub fn sample<V: AsRef<[f64]>>(&self, vectors: &[V], m: usize, seed: u64) -> PadResult<PairSample> {
        let n = vectors.len();
        let total = pair_count(n);
        if m > total {
            return Err(PadError::validation(format!(
                "cannot sample {} pairs from {} records ({} pairs available)",
                m, n, total
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut ranks = index::sample(&mut rng, total, m).into_vec();
        ranks.sort_unstable();

        let index_pairs: Vec<(usize, usize)> = ranks.into_iter().map(|r| unrank_pair(n, r)).collect();
        let pairs = index_pairs
            .iter()
            .map(|&(i, j)| {
                RecordPair::new(i, j, vectors[i].as_ref().to_vec(), vectors[j].as_ref().to_vec())
            })
            .collect();

        debug!(records = n, requested = m, available = total, seed, "sampled record pairs");

        Ok(PairSample { pairs, index_pairs })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn vectors(n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|i| vec![i as f64]).collect()
    }

    #[test]
    fn test_pair_count() {
        assert_eq!(pair_count(0), 0);
        assert_eq!(pair_count(1), 0);
        assert_eq!(pair_count(2), 1);
        assert_eq!(pair_count(10), 45);
    }

    #[test]
    fn test_unrank_enumerates_lexicographically() {
        let n = 6;
        let mut expected = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                expected.push((i, j));
            }
        }
        let unranked: Vec<_> = (0..pair_count(n)).map(|r| unrank_pair(n, r)).collect();
        assert_eq!(unranked, expected);
    }

    #[test]
    fn test_full_sample_returns_every_pair_once() {
        let n = 9;
        let sample = PairSampler.sample(&vectors(n), pair_count(n), 1).unwrap();
        let unique: HashSet<_> = sample.index_pairs.iter().copied().collect();
        assert_eq!(sample.len(), 36);
        assert_eq!(unique.len(), 36);
        assert!(sample.index_pairs.iter().all(|&(i, j)| i < j && j < n));
    }

    #[test]
    fn test_sample_has_no_duplicates_or_self_pairs() {
        let sample = PairSampler.sample(&vectors(200), 500, 99).unwrap();
        let unique: HashSet<_> = sample.index_pairs.iter().copied().collect();
        assert_eq!(unique.len(), 500);
        assert!(sample.index_pairs.iter().all(|&(i, j)| i < j));
        for (pair, &(i, j)) in sample.pairs.iter().zip(&sample.index_pairs) {
            assert_eq!(pair.indices(), (i, j));
            assert_eq!(pair.left, vec![i as f64]);
            assert_eq!(pair.right, vec![j as f64]);
        }
    }

    #[test]
    fn test_sample_is_deterministic_per_seed() {
        let data = vectors(50);
        let a = PairSampler.sample(&data, 40, 7).unwrap();
        let b = PairSampler.sample(&data, 40, 7).unwrap();
        let c = PairSampler.sample(&data, 40, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.index_pairs, c.index_pairs);
    }

    #[test]
    fn test_too_many_pairs() {
        let err = PairSampler.sample(&vectors(4), 7, 0).unwrap_err();
        assert!(err.to_string().contains("6 pairs available"));
    }

    #[test]
    fn test_empty_sample() {
        let sample = PairSampler.sample(&vectors(1), 0, 0).unwrap();
        assert!(sample.is_empty());
    }
}
