//! Interest statistics and utility loss.
//!
//! Adapters between raw profiles and the statistics a consumer declared
//! interest in. Two uses:
//!
//! - `InterestSet::statistic_distance`: how different two profiles look to
//!   the consumer (drives similarity labelling and the generic metric)
//! - `InterestSet::loss`: how much of the statistic a sanitization destroyed
//!
//! [`BlockInterests`] does the same for profiles split into column blocks,
//! where each block only carries its share of a windowed statistic.
//!
//! Loss per interest is the mean absolute statistic difference over records
//! (Euclidean norm per record for `segment`). The aggregate is the mean over
//! interests.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{PadError, PadResult};
use crate::types::{InterestMode, InterestSet, InterestSpec};

/// Value of one interest statistic for one profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Statistic {
    /// Single number (arrival, departure, usage, window-usage).
    Scalar(f64),
    /// Slice of the profile (segment).
    Series(Vec<f64>),
}

impl Statistic {
    /// Distance between two statistics of the same interest.
    ///
    /// Scalars compare by absolute difference, series by Euclidean norm.
    /// Mismatched kinds never look close.
    pub fn distance(&self, other: &Statistic) -> f64 {
        match (self, other) {
            (Statistic::Scalar(a), Statistic::Scalar(b)) => (a - b).abs(),
            (Statistic::Series(a), Statistic::Series(b)) if a.len() == b.len() => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            _ => f64::INFINITY,
        }
    }
}

/// Compute the statistic `spec` declares for `values`.
///
/// Windows are clamped to the profile length; specs are validated before
/// they reach this point.
pub fn compute(spec: &InterestSpec, values: &[f64], activity_threshold: f64) -> Statistic {
    let (start, end) = match spec.window {
        Some(w) => {
            let end = w.end.min(values.len());
            (w.start.min(end), end)
        }
        None => (0, values.len()),
    };

    match spec.mode {
        InterestMode::Arrival => Statistic::Scalar(
            values
                .iter()
                .position(|&v| v > activity_threshold)
                .unwrap_or(values.len()) as f64,
        ),
        InterestMode::Departure => Statistic::Scalar(
            values
                .iter()
                .rposition(|&v| v > activity_threshold)
                .map(|i| i + 1)
                .unwrap_or(0) as f64,
        ),
        InterestMode::Usage => Statistic::Scalar(values.iter().sum()),
        InterestMode::WindowUsage => Statistic::Scalar(values[start..end].iter().sum()),
        InterestMode::Segment => Statistic::Series(values[start..end].to_vec()),
    }
}

/// Utility loss of a sanitization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityLoss {
    /// Mean of the per-interest losses.
    pub aggregate: f64,
    /// Loss for each interest, in declaration order.
    pub per_interest: Vec<InterestLoss>,
}

/// Loss attributed to one interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestLoss {
    /// The interest.
    pub interest: InterestSpec,
    /// Mean statistic error over records.
    pub loss: f64,
}

impl InterestSet {
    /// Distance between two profiles as seen through every interest.
    ///
    /// Euclidean norm of the per-interest statistic distances.
    pub fn statistic_distance(&self, a: &[f64], b: &[f64]) -> f64 {
        let threshold = self.activity_threshold();
        self.specs()
            .iter()
            .map(|spec| {
                compute(spec, a, threshold)
                    .distance(&compute(spec, b, threshold))
                    .powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Utility loss between original and sanitized profiles.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if the two slices differ in length or
    /// are empty.
    pub fn loss<A, B>(&self, original: &[A], sanitized: &[B]) -> PadResult<UtilityLoss>
    where
        A: AsRef<[f64]>,
        B: AsRef<[f64]>,
    {
        let threshold = self.activity_threshold();
        let specs = self.specs();
        mean_loss(specs, original, sanitized, |interest, _, o, s| {
            let spec = &specs[interest];
            compute(spec, o, threshold).distance(&compute(spec, s, threshold))
        })
    }
}

/// Mean of `record_loss(interest, position, original, sanitized)` over
/// records, per interest.
fn mean_loss<A, B, F>(
    specs: &[InterestSpec],
    original: &[A],
    sanitized: &[B],
    record_loss: F,
) -> PadResult<UtilityLoss>
where
    A: AsRef<[f64]>,
    B: AsRef<[f64]>,
    F: Fn(usize, usize, &[f64], &[f64]) -> f64,
{
    if original.len() != sanitized.len() {
        return Err(PadError::validation(format!(
            "cannot compare {} original records with {} sanitized records",
            original.len(),
            sanitized.len()
        )));
    }
    if original.is_empty() {
        return Err(PadError::validation("cannot measure loss of an empty dataset"));
    }

    let n = original.len() as f64;
    let per_interest: Vec<InterestLoss> = specs
        .iter()
        .enumerate()
        .map(|(interest, spec)| {
            let total: f64 = original
                .iter()
                .zip(sanitized.iter())
                .enumerate()
                .map(|(position, (o, s))| record_loss(interest, position, o.as_ref(), s.as_ref()))
                .sum();
            InterestLoss {
                interest: *spec,
                loss: total / n,
            }
        })
        .collect();

    let aggregate = per_interest.iter().map(|l| l.loss).sum::<f64>() / per_interest.len() as f64;

    Ok(UtilityLoss {
        aggregate,
        per_interest,
    })
}

/// One interest as seen by one block.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BlockView {
    mode: InterestMode,
    /// Block-local interest; `None` when the block lies outside the window.
    local: Option<InterestSpec>,
    /// Position of the block's share inside the full window.
    offset: usize,
    /// Width of the full window; 0 for windowless interests.
    span: usize,
}

impl BlockView {
    fn new(spec: &InterestSpec, columns: Range<usize>) -> Self {
        let (offset, span) = match spec.window {
            Some(w) => (columns.start.saturating_sub(w.start), w.width()),
            None => (0, 0),
        };
        Self {
            mode: spec.mode,
            local: spec.restrict(columns),
            offset,
            span,
        }
    }

    /// The block's share of the statistic.
    ///
    /// Window usage outside the window is 0. Segment shares sit at their
    /// position in the full window, zeros elsewhere.
    fn contribution(&self, values: &[f64], threshold: f64) -> Statistic {
        let Some(local) = &self.local else {
            return match self.mode {
                InterestMode::Segment => Statistic::Series(vec![0.0; self.span]),
                _ => Statistic::Scalar(0.0),
            };
        };
        match compute(local, values, threshold) {
            Statistic::Series(piece) if self.span > 0 => {
                let mut full = vec![0.0; self.span];
                let offset = self.offset.min(self.span);
                full[offset..]
                    .iter_mut()
                    .zip(piece)
                    .for_each(|(slot, v)| *slot = v);
                Statistic::Series(full)
            }
            other => other,
        }
    }
}

/// An interest set applied to profiles split into column blocks.
///
/// Rows are blocks laid out record-major, so row `r` holds block
/// `r % blocks()` of its source profile. Each block is measured only on the
/// part of every window it actually contains.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInterests {
    interests: InterestSet,
    views: Vec<Vec<BlockView>>,
    merged: InterestSet,
}

impl BlockInterests {
    /// Restrict `interests` to every block in `ranges`.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if `ranges` is empty or no block
    /// overlaps any interest.
    pub fn new(interests: &InterestSet, ranges: &[Range<usize>]) -> PadResult<Self> {
        if ranges.is_empty() {
            return Err(PadError::validation("at least one block is required"));
        }

        let views: Vec<Vec<BlockView>> = ranges
            .iter()
            .map(|range| {
                interests
                    .specs()
                    .iter()
                    .map(|spec| BlockView::new(spec, range.clone()))
                    .collect()
            })
            .collect();

        let mut merged: Vec<InterestSpec> = Vec::new();
        for local in views.iter().flatten().filter_map(|v| v.local) {
            if !merged.contains(&local) {
                merged.push(local);
            }
        }
        let merged = InterestSet::new(merged, interests.activity_threshold())?;

        Ok(Self {
            interests: interests.clone(),
            views,
            merged,
        })
    }

    /// Number of blocks per source profile.
    pub fn blocks(&self) -> usize {
        self.views.len()
    }

    /// Block held by row `row`.
    #[inline]
    pub fn block_of(&self, row: usize) -> usize {
        row % self.views.len()
    }

    /// The interests on whole profiles.
    pub fn interests(&self) -> &InterestSet {
        &self.interests
    }

    /// Every distinct block-local interest in one set.
    ///
    /// For metrics that compare block vectors without knowing which block
    /// they came from.
    pub fn merged(&self) -> &InterestSet {
        &self.merged
    }

    /// Distance between row `row_a` with values `a` and row `row_b` with
    /// values `b`, each measured through its own block.
    pub fn statistic_distance(&self, row_a: usize, a: &[f64], row_b: usize, b: &[f64]) -> f64 {
        let threshold = self.interests.activity_threshold();
        let left = &self.views[self.block_of(row_a)];
        let right = &self.views[self.block_of(row_b)];
        left.iter()
            .zip(right.iter())
            .map(|(l, r)| {
                l.contribution(a, threshold)
                    .distance(&r.contribution(b, threshold))
                    .powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Utility loss over blocks; `rows[i]` is the row of `original[i]`.
    ///
    /// A block outside a window loses nothing on that interest.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if `rows`, `original` and `sanitized`
    /// differ in length or are empty.
    pub fn loss<A, B>(&self, rows: &[usize], original: &[A], sanitized: &[B]) -> PadResult<UtilityLoss>
    where
        A: AsRef<[f64]>,
        B: AsRef<[f64]>,
    {
        if rows.len() != original.len() {
            return Err(PadError::validation(format!(
                "{} row indices given for {} records",
                rows.len(),
                original.len()
            )));
        }
        let threshold = self.interests.activity_threshold();
        mean_loss(self.interests.specs(), original, sanitized, |interest, position, o, s| {
            let view = &self.views[self.block_of(rows[position])][interest];
            view.contribution(o, threshold)
                .distance(&view.contribution(s, threshold))
        })
    }
}
