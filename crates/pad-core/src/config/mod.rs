//! Root configuration for a publication run.
//!
//! `PadConfig` aggregates every tunable of the pipeline. It is loaded once,
//! validated, and then passed by reference; nothing reads configuration
//! from global state.
//!
//! # Loading Configuration
//!
//! ```rust,ignore
//! use pad_core::PadConfig;
//!
//! let config = PadConfig::from_file("pad.toml")?.with_env_overrides();
//! config.validate()?;
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! description = "Household daily consumption, 15 min resolution"
//! activity_threshold = 0.0
//!
//! [anonymity]
//! k = 5
//! min_resample_factor = 2
//!
//! [clustering]
//! rep_mode = "mean"
//! generic_metric = "interest"
//!
//! [sampling]
//! initial_fraction = 0.1
//! fraction_step = 0.1
//! max_retries = 5
//! max_pairs = 20000
//! seed = 42
//!
//! [labeling]
//! min_clusters = 2
//! max_clusters = 8
//!
//! [selection]
//! evaluation_fraction = 0.1
//! parallel = true
//!
//! [learner]
//! candidates = ["diagonal", "blockwise"]
//!
//! [[interests]]
//! mode = "window-usage"
//! window = [17, 21]
//! ```
//!
//! Invalid values are rejected by `validate`; nothing is silently clamped.

mod sections;


pub use sections::{AnonymitySection, ClusteringSection, SamplingSection, SelectionSection};

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PadError, PadResult};
use crate::labeling::LabelingConfig;
use crate::learner::LearnerConfig;
use crate::types::{InterestSet, InterestSpec};

fn default_interests() -> Vec<InterestSpec> {
    vec![InterestSpec::usage()]
}

/// Root configuration of a publication run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadConfig {
    /// Free-text description of the published data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Values strictly above this count as activity for arrival/departure.
    #[serde(default)]
    pub activity_threshold: f64,

    /// Anonymity requirement.
    #[serde(default)]
    pub anonymity: AnonymitySection,

    /// Clustering engine.
    #[serde(default)]
    pub clustering: ClusteringSection,

    /// Pair sampling and retries.
    #[serde(default)]
    pub sampling: SamplingSection,

    /// Similarity labelling.
    #[serde(default)]
    pub labeling: LabelingConfig,

    /// Candidate evaluation.
    #[serde(default)]
    pub selection: SelectionSection,

    /// Metric learners.
    #[serde(default)]
    pub learner: LearnerConfig,

    /// Statistics the consumer wants preserved.
    #[serde(default = "default_interests")]
    pub interests: Vec<InterestSpec>,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            description: None,
            activity_threshold: 0.0,
            anonymity: AnonymitySection::default(),
            clustering: ClusteringSection::default(),
            sampling: SamplingSection::default(),
            labeling: LabelingConfig::default(),
            selection: SelectionSection::default(),
            learner: LearnerConfig::default(),
            interests: default_interests(),
        }
    }
}

impl PadConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `PadError::Config` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> PadResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| {
            PadError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&contents).map_err(|e| {
            PadError::config(format!(
                "Failed to parse TOML in '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> PadResult<Self> {
        toml::from_str(toml).map_err(|e| PadError::config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> PadResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PadError::config(format!("Failed to serialize to TOML: {}", e)))
    }

    /// Validate every section, returning the first error.
    ///
    /// Interest windows are only checked for shape here; their bounds are
    /// checked against the dataset dimension when a run starts.
    pub fn validate(&self) -> PadResult<()> {
        self.anonymity.validate()?;
        self.clustering.validate()?;
        self.sampling.validate()?;
        self.labeling.validate()?;
        self.selection.validate()?;
        self.learner.validate()?;

        if !self.activity_threshold.is_finite() {
            return Err(PadError::config("activity_threshold must be finite"));
        }
        if self.interests.is_empty() {
            return Err(PadError::config("[[interests]] at least one interest is required"));
        }
        for (i, spec) in self.interests.iter().enumerate() {
            // usize::MAX: bounds are checked against the dataset later
            spec.validate(usize::MAX)
                .map_err(|e| PadError::config(format!("[[interests]] #{}: {}", i, e)))?;
        }
        Ok(())
    }

    /// Build the immutable interest set of a run.
    pub fn interest_set(&self) -> PadResult<InterestSet> {
        InterestSet::new(self.interests.clone(), self.activity_threshold)
    }

    /// Apply environment variable overrides. Prefix: `PAD_`
    ///
    /// # Supported Variables
    ///
    /// | Variable | Config Path | Type |
    /// |----------|-------------|------|
    /// | `PAD_K` | `anonymity.k` | usize |
    /// | `PAD_SEED` | `sampling.seed` | u64 |
    /// | `PAD_MAX_RETRIES` | `sampling.max_retries` | usize |
    /// | `PAD_MAX_PAIRS` | `sampling.max_pairs` | usize |
    /// | `PAD_PARALLEL` | `selection.parallel` | bool |
    /// | `PAD_REP_MODE` | `clustering.rep_mode` | mean/median/max/min |
    /// | `PAD_MAX_DURATION_SECS` | `clustering.max_duration_secs` | u64 |
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("PAD_K") {
            if let Ok(n) = val.parse::<usize>() {
                self.anonymity.k = n;
            }
        }

        if let Ok(val) = env::var("PAD_SEED") {
            if let Ok(n) = val.parse::<u64>() {
                self.sampling.seed = Some(n);
            }
        }
        if let Ok(val) = env::var("PAD_MAX_RETRIES") {
            if let Ok(n) = val.parse::<usize>() {
                self.sampling.max_retries = n;
            }
        }
        if let Ok(val) = env::var("PAD_MAX_PAIRS") {
            if let Ok(n) = val.parse::<usize>() {
                self.sampling.max_pairs = n;
            }
        }

        if let Ok(val) = env::var("PAD_PARALLEL") {
            if let Ok(b) = val.parse::<bool>() {
                self.selection.parallel = b;
            }
        }

        if let Ok(val) = env::var("PAD_REP_MODE") {
            if let Ok(mode) = val.parse() {
                self.clustering.rep_mode = mode;
            }
        }
        if let Ok(val) = env::var("PAD_MAX_DURATION_SECS") {
            if let Ok(n) = val.parse::<u64>() {
                self.clustering.max_duration_secs = Some(n);
            }
        }

        self
    }

    /// Human-readable description of what the published data preserves.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        if let Some(description) = &self.description {
            lines.push(description.clone());
        }
        lines.push(format!(
            "Published under {}-anonymity: every profile is shared by at least {} records.",
            self.anonymity.k, self.anonymity.k
        ));
        lines.push(format!(
            "Each group publishes the {} of its members' profiles.",
            self.clustering.rep_mode
        ));
        for spec in &self.interests {
            lines.push(format!("Optimized to preserve: {}", spec));
        }
        if self.activity_threshold != 0.0 {
            lines.push(format!(
                "Activity threshold for arrival/departure: {}",
                self.activity_threshold
            ));
        }
        lines.join("\n")
    }
}
