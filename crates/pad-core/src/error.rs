//! Error types for pad-core.
//!
//! Every failure of the publication pipeline is fatal and typed. The only
//! local recovery is the similarity-labelling retry in the orchestrator,
//! which turns into [`PadError::RetryBudgetExceeded`] once its bound is hit.
//!
//! # Examples
//!
//! ```rust
//! use pad_core::error::{PadError, PadResult};
//!
//! fn require_records(n: usize, k: usize) -> PadResult<()> {
//!     if n < k {
//!         return Err(PadError::insufficient_data(k, n));
//!     }
//!     Ok(())
//! }
//!
//! assert!(matches!(
//!     require_records(3, 5),
//!     Err(PadError::InsufficientData { required: 5, actual: 3 })
//! ));
//! ```

use thiserror::Error;

/// Errors raised by the publication pipeline and its components.
#[derive(Debug, Error)]
pub enum PadError {
    /// Malformed input or contract mismatch between dataset, metadata and interests.
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the violated contract
        message: String,
    },

    /// k-anonymity is unattainable for the given number of records.
    ///
    /// # When This Occurs
    ///
    /// - Fewer records than the anonymity level
    /// - Leftover records with no closed group to absorb them
    /// - No resampling factor can inflate the dataset far enough
    #[error("Insufficient data: required {required}, actual {actual}")]
    InsufficientData {
        /// Minimum required records
        required: usize,
        /// Records actually available
        actual: usize,
    },

    /// Similarity labels are degenerate and no metric can be trained from them.
    #[error("Insufficient signal: {message}")]
    InsufficientSignal {
        /// Why the labels carry no signal
        message: String,
    },

    /// The labelling retry loop ran out of attempts.
    #[error(
        "Retry budget exceeded after {attempts} attempts (last sample fraction {last_fraction:.2}): \
         data too homogeneous to sample meaningful similarity pairs"
    )]
    RetryBudgetExceeded {
        /// Number of labelling attempts made
        attempts: usize,
        /// Sample fraction used by the last attempt
        last_fraction: f64,
    },

    /// A bounded loop exceeded its wall-clock or iteration budget.
    #[error("Timeout in {stage} after {elapsed_ms} ms ({steps} steps)")]
    Timeout {
        /// Stage that ran out of budget
        stage: String,
        /// Elapsed wall-clock time in milliseconds
        elapsed_ms: u128,
        /// Iterations completed before the budget ran out
        steps: usize,
    },

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Section-prefixed description of the problem
        message: String,
    },

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PadError {
    /// Create a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an InsufficientData error.
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// Create an InsufficientSignal error.
    pub fn insufficient_signal(message: impl Into<String>) -> Self {
        Self::InsufficientSignal {
            message: message.into(),
        }
    }

    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a Timeout error.
    pub fn timeout(stage: impl Into<String>, elapsed_ms: u128, steps: usize) -> Self {
        Self::Timeout {
            stage: stage.into(),
            elapsed_ms,
            steps,
        }
    }

    /// True when the error means the published data could not be made k-anonymous.
    pub fn is_anonymity_failure(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::InsufficientSignal { .. }
                | Self::RetryBudgetExceeded { .. }
                | Self::Timeout { .. }
        )
    }
}

/// Result alias used throughout pad-core.
pub type PadResult<T> = Result<T, PadError>;
