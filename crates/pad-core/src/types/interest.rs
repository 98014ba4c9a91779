//! Interest specifications.
//!
//! An interest declares which derived statistic of a profile the data
//! consumer wants preserved. It drives both the utility-loss measurement
//! and the automatic similarity judgement of sampled pairs.
//!
//! # Modes
//!
//! | Mode | Statistic | Window |
//! |------|-----------|--------|
//! | `arrival` | first active slot | no |
//! | `departure` | end of last active slot | no |
//! | `usage` | total usage | no |
//! | `window-usage` | usage inside `[start, end)` | required |
//! | `segment` | the raw slice `[start, end)` | required |

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{PadError, PadResult};

/// Derived statistic the consumer is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterestMode {
    /// First slot whose value exceeds the activity threshold.
    Arrival,
    /// One past the last slot whose value exceeds the activity threshold.
    Departure,
    /// Sum over the whole profile.
    Usage,
    /// Sum over a window.
    WindowUsage,
    /// The values inside a window, compared as a vector.
    Segment,
}

impl InterestMode {
    /// Whether this mode needs a window.
    #[inline]
    pub fn requires_window(&self) -> bool {
        matches!(self, InterestMode::WindowUsage | InterestMode::Segment)
    }

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestMode::Arrival => "arrival",
            InterestMode::Departure => "departure",
            InterestMode::Usage => "usage",
            InterestMode::WindowUsage => "window-usage",
            InterestMode::Segment => "segment",
        }
    }
}

impl fmt::Display for InterestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open column window `[start, end)`.
///
/// Serialized as a two-element array, e.g. `[17, 21]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Window {
    /// First column inside the window.
    pub start: usize,
    /// First column after the window.
    pub end: usize,
}

impl Window {
    /// Create a window.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of columns covered.
    #[inline]
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

impl From<[usize; 2]> for Window {
    fn from(bounds: [usize; 2]) -> Self {
        Self::new(bounds[0], bounds[1])
    }
}

impl From<Window> for [usize; 2] {
    fn from(window: Window) -> Self {
        [window.start, window.end]
    }
}

/// One interest: a mode plus its window when the mode needs one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterestSpec {
    /// Statistic to preserve.
    pub mode: InterestMode,

    /// Column window for `window-usage` and `segment`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
}

impl InterestSpec {
    /// Interest without a window.
    pub fn new(mode: InterestMode) -> Self {
        Self { mode, window: None }
    }

    /// Interest with a window.
    pub fn windowed(mode: InterestMode, start: usize, end: usize) -> Self {
        Self {
            mode,
            window: Some(Window::new(start, end)),
        }
    }

    /// Total usage.
    pub fn usage() -> Self {
        Self::new(InterestMode::Usage)
    }

    /// Usage inside `[start, end)`.
    pub fn window_usage(start: usize, end: usize) -> Self {
        Self::windowed(InterestMode::WindowUsage, start, end)
    }

    /// Check the spec against a profile dimension.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if a windowed mode has no window, the
    /// window is empty, or it extends past `dimension`.
    pub fn validate(&self, dimension: usize) -> PadResult<()> {
        match (self.mode.requires_window(), self.window) {
            (true, None) => Err(PadError::validation(format!(
                "interest '{}' requires a window",
                self.mode
            ))),
            (_, Some(w)) if w.start >= w.end => Err(PadError::validation(format!(
                "interest '{}' has empty window [{}, {})",
                self.mode, w.start, w.end
            ))),
            (_, Some(w)) if w.end > dimension => Err(PadError::validation(format!(
                "interest '{}' window [{}, {}) exceeds dimension {}",
                self.mode, w.start, w.end, dimension
            ))),
            _ => Ok(()),
        }
    }

    /// The part of this interest that falls inside `columns`, re-expressed
    /// relative to `columns.start`.
    ///
    /// Windowless interests apply unchanged. A windowed interest keeps the
    /// intersection of its window with `columns`; `None` when they do not
    /// overlap.
    pub fn restrict(&self, columns: Range<usize>) -> Option<Self> {
        let Some(window) = self.window else {
            return Some(*self);
        };
        let start = window.start.max(columns.start);
        let end = window.end.min(columns.end);
        (start < end).then(|| Self {
            mode: self.mode,
            window: Some(Window::new(start - columns.start, end - columns.start)),
        })
    }
}

impl fmt::Display for InterestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.window {
            Some(w) => write!(f, "{} [{}, {})", self.mode, w.start, w.end),
            None => write!(f, "{}", self.mode),
        }
    }
}

/// Immutable set of interests evaluated together.
///
/// Built once per run and passed explicitly through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct InterestSet {
    specs: Vec<InterestSpec>,
    activity_threshold: f64,
}

impl InterestSet {
    /// Create a set from one or more specs.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if `specs` is empty or the threshold
    /// is not finite.
    pub fn new(specs: Vec<InterestSpec>, activity_threshold: f64) -> PadResult<Self> {
        if specs.is_empty() {
            return Err(PadError::validation("at least one interest is required"));
        }
        if !activity_threshold.is_finite() {
            return Err(PadError::validation("activity threshold must be finite"));
        }
        Ok(Self {
            specs,
            activity_threshold,
        })
    }

    /// Single interest with a zero activity threshold.
    pub fn single(spec: InterestSpec) -> Self {
        Self {
            specs: vec![spec],
            activity_threshold: 0.0,
        }
    }

    /// The specs, in declaration order.
    pub fn specs(&self) -> &[InterestSpec] {
        &self.specs
    }

    /// Values strictly above this count as activity for arrival/departure.
    pub fn activity_threshold(&self) -> f64 {
        self.activity_threshold
    }

    /// Validate every spec against `dimension`.
    pub fn validate(&self, dimension: usize) -> PadResult<()> {
        self.specs.iter().try_for_each(|s| s.validate(dimension))
    }
}
