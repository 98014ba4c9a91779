//! Pipeline stages, in execution order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a publication run.
///
/// `Resample` and `Reassemble` only run when the dataset is too small for
/// the requested anonymity level. `SamplePairs` and `Label` repeat until
/// labelling succeeds or the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    /// Check dataset and interests.
    Verify,
    /// Split records into blocks.
    Resample,
    /// Cluster with the generic metric.
    Presanitize,
    /// Draw record pairs from the pre-sanitized data.
    SamplePairs,
    /// Derive similarity labels.
    Label,
    /// Train and evaluate candidate metrics.
    TrainMetric,
    /// Cluster with the selected metric.
    FinalSanitize,
    /// Stitch blocks back into records.
    Reassemble,
    /// Measure loss and assemble the result.
    Report,
}

impl PipelineStage {
    /// Get the stage index (0-8).
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Self::Verify => 0,
            Self::Resample => 1,
            Self::Presanitize => 2,
            Self::SamplePairs => 3,
            Self::Label => 4,
            Self::TrainMetric => 5,
            Self::FinalSanitize => 6,
            Self::Reassemble => 7,
            Self::Report => 8,
        }
    }

    /// Get all stages in order.
    pub fn all() -> [Self; 9] {
        [
            Self::Verify,
            Self::Resample,
            Self::Presanitize,
            Self::SamplePairs,
            Self::Label,
            Self::TrainMetric,
            Self::FinalSanitize,
            Self::Reassemble,
            Self::Report,
        ]
    }

    /// Log name of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Resample => "resample",
            Self::Presanitize => "presanitize",
            Self::SamplePairs => "sample-pairs",
            Self::Label => "label",
            Self::TrainMetric => "train-metric",
            Self::FinalSanitize => "final-sanitize",
            Self::Reassemble => "reassemble",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
