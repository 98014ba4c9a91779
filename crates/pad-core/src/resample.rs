//! Resampling fallback for datasets too small for the requested k.
//!
//! A dataset of `n` records can be clustered directly only when
//! `n >= (2k - 1) * 5`. Otherwise each profile is cut into `f` contiguous
//! blocks and every block is published as its own pseudo-record, giving
//! `n * f` records at a relaxed anonymity level. After sanitization the
//! blocks are stitched back together per source record.
//!
//! # Example
//!
//! ```
//! use pad_core::resample::{is_feasible, AnonymityResampler};
//!
//! assert!(!is_feasible(8, 5));
//! let plan = AnonymityResampler::new(2).plan(8, 24, 5).unwrap();
//! assert_eq!(plan.factor, 6);
//! assert_eq!(plan.block_width, 4);
//! assert_eq!(plan.effective_k, 5);
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PadError, PadResult};
use crate::types::{Dataset, InterestSet, Record, Window};

/// Default lower bound on the split factor.
pub const DEFAULT_MIN_RESAMPLE_FACTOR: usize = 2;

/// Records needed to cluster directly at anonymity level `k`.
#[inline]
pub fn required_records(k: usize) -> usize {
    (2 * k).saturating_sub(1) * 5
}

/// Whether `n` records can be clustered directly at level `k`.
#[inline]
pub fn is_feasible(n: usize, k: usize) -> bool {
    n >= required_records(k)
}

/// Highest anonymity level supported by `n` records.
#[inline]
pub fn max_anonymity(n: usize) -> usize {
    (n + 5) / 10
}

/// Split `0..dimension` into `factor` contiguous ranges.
///
/// The first `dimension % factor` ranges are one column wider. `factor`
/// must lie in `1..=dimension`.
pub fn block_ranges(dimension: usize, factor: usize) -> Vec<Range<usize>> {
    if factor == 0 {
        return Vec::new();
    }
    let base = dimension / factor;
    let wider = dimension % factor;
    let mut ranges = Vec::with_capacity(factor);
    let mut start = 0;
    for b in 0..factor {
        let width = base + usize::from(b < wider);
        ranges.push(start..start + width);
        start += width;
    }
    ranges
}

/// Chosen split for an infeasible dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResamplePlan {
    /// Blocks per source record.
    pub factor: usize,
    /// Anonymity level applied to the pseudo-records.
    pub effective_k: usize,
    /// Columns per block.
    pub block_width: usize,
}

/// How a dataset was split; needed to reassemble it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    /// Blocks per source record.
    pub factor: usize,
    /// Column range of each block in the source profile.
    pub ranges: Vec<Range<usize>>,
}

/// Whether `window` lies inside one block of `width` columns.
fn within_one_block(window: &Window, width: usize) -> bool {
    width > 0 && window.start / width == window.end.saturating_sub(1) / width
}

/// Key of block `block` of source record `key`.
pub fn block_key(key: &str, block: usize) -> String {
    format!("{}#{}", key, block)
}

/// Splits and reassembles datasets.
#[derive(Debug, Clone)]
pub struct AnonymityResampler {
    min_factor: usize,
}

impl Default for AnonymityResampler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_RESAMPLE_FACTOR)
    }
}

impl AnonymityResampler {
    /// Create a resampler that never splits into fewer than `min_factor`
    /// blocks.
    pub fn new(min_factor: usize) -> Self {
        Self {
            min_factor: min_factor.max(1),
        }
    }

    /// Choose the split factor for `n` records of `dimension` columns.
    ///
    /// The factor is the smallest divisor of `dimension` that is at least
    /// `min_factor` and inflates the dataset to `(2k - 1) * 5` records.
    ///
    /// # Errors
    ///
    /// Returns `PadError::InsufficientData` if no divisor is large enough.
    pub fn plan(&self, n: usize, dimension: usize, k: usize) -> PadResult<ResamplePlan> {
        self.plan_with_windows(n, dimension, k, &[])
    }

    /// Like [`plan`](Self::plan), but prefers a factor whose blocks keep
    /// every interest window whole.
    ///
    /// Among the sufficient divisors the smallest one that puts each window
    /// inside a single block wins. When none does, the smallest sufficient
    /// divisor is used and windows are measured per block.
    pub fn plan_for(
        &self,
        n: usize,
        dimension: usize,
        k: usize,
        interests: &InterestSet,
    ) -> PadResult<ResamplePlan> {
        let windows: Vec<Window> = interests.specs().iter().filter_map(|s| s.window).collect();
        self.plan_with_windows(n, dimension, k, &windows)
    }

    fn plan_with_windows(
        &self,
        n: usize,
        dimension: usize,
        k: usize,
        windows: &[Window],
    ) -> PadResult<ResamplePlan> {
        let required = required_records(k);
        if n == 0 {
            return Err(PadError::insufficient_data(required, 0));
        }
        let needed = required.div_ceil(n).max(self.min_factor);

        let mut divisors = (needed..=dimension).filter(|f| dimension % f == 0).peekable();
        let Some(&smallest) = divisors.peek() else {
            return Err(PadError::insufficient_data(required, n * dimension));
        };
        let aligned = divisors.find(|&f| windows.iter().all(|w| within_one_block(w, dimension / f)));
        if aligned.is_none() {
            debug!(
                windows = windows.len(),
                factor = smallest,
                "no split keeps every window in one block; windows are measured per block"
            );
        }
        let factor = aligned.unwrap_or(smallest);

        let inflated = n * factor;
        let plan = ResamplePlan {
            factor,
            effective_k: max_anonymity(inflated).min(k * n),
            block_width: dimension / factor,
        };
        info!(
            records = n,
            dimension,
            requested_k = k,
            factor,
            pseudo_records = inflated,
            effective_k = plan.effective_k,
            "dataset too small for requested k; resampling into blocks"
        );
        Ok(plan)
    }

    /// Cut every record into `factor` blocks.
    ///
    /// Pseudo-records are emitted record-major: all blocks of the first
    /// record, then all blocks of the second, and so on.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if the dataset is malformed or
    /// `factor` is outside `1..=dimension`.
    pub fn split(&self, dataset: &Dataset, factor: usize) -> PadResult<(Dataset, BlockLayout)> {
        let dimension = dataset.validate()?;
        if factor == 0 || factor > dimension {
            return Err(PadError::validation(format!(
                "split factor {} outside 1..={}",
                factor, dimension
            )));
        }

        let ranges = block_ranges(dimension, factor);
        let records = dataset
            .records
            .iter()
            .flat_map(|record| {
                ranges.iter().enumerate().map(move |(b, range)| {
                    Record::new(block_key(&record.key, b), record.values[range.clone()].to_vec())
                })
            })
            .collect();

        Ok((Dataset::new(records), BlockLayout { factor, ranges }))
    }

    /// Stitch sanitized blocks back into full records.
    ///
    /// Keys, order, column labels and metadata come from `source`.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if `blocks` does not match the layout
    /// of `source`.
    pub fn reassemble(&self, source: &Dataset, blocks: &Dataset, layout: &BlockLayout) -> PadResult<Dataset> {
        let expected = source.len() * layout.factor;
        if blocks.len() != expected {
            return Err(PadError::validation(format!(
                "expected {} blocks for {} records, got {}",
                expected,
                source.len(),
                blocks.len()
            )));
        }

        let mut values = Vec::with_capacity(source.len());
        for (r, record) in source.records.iter().enumerate() {
            let mut joined = Vec::with_capacity(record.dimension());
            for (b, range) in layout.ranges.iter().enumerate() {
                let block = &blocks.records[r * layout.factor + b];
                if block.key != block_key(&record.key, b) || block.values.len() != range.len() {
                    return Err(PadError::validation(format!(
                        "block '{}' does not match block {} of record '{}'",
                        block.key, b, record.key
                    )));
                }
                joined.extend_from_slice(&block.values);
            }
            values.push(joined);
        }

        source.with_values(values)
    }
}
