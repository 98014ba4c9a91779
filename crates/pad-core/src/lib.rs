//! PAD Core Library
//!
//! Special-purpose publication of daily usage profiles under k-anonymity.
//!
//! # Architecture
//!
//! This crate defines:
//! - Domain types (`Record`, `Dataset`, `InterestSpec`, `RecordGroup`, `RecordPair`)
//! - The K-ward clustering engine (`kward`)
//! - Unbiased pair sampling (`sampling`) and automatic similarity labelling (`labeling`)
//! - Pluggable distance metrics (`metric`) and metric learners (`learner`)
//! - The resampling fallback for small datasets (`resample`)
//! - The publication pipeline that sequences all of the above (`pipeline`)
//!
//! # Example
//!
//! ```
//! use pad_core::kward::{KWard, RepMode};
//! use pad_core::metric::VectorMetric;
//!
//! let vectors = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.0],
//!     vec![5.0, 5.0],
//!     vec![5.1, 5.0],
//! ];
//! let groups = KWard::new(2, RepMode::Mean)
//!     .cluster(&vectors, &VectorMetric::Euclidean)
//!     .unwrap();
//! assert_eq!(groups.len(), 2);
//! assert!(groups.iter().all(|g| g.len() >= 2));
//! ```

pub mod config;
pub mod error;
pub mod kward;
pub mod labeling;
pub mod learner;
pub mod metric;
pub mod pipeline;
pub mod resample;
pub mod sampling;
pub mod statistics;
pub mod types;

// Re-exports for convenience
pub use config::PadConfig;
pub use error::{PadError, PadResult};
pub use pipeline::{Publication, Publisher};
pub use types::{
    Dataset, InterestMode, InterestSet, InterestSpec, Record, RecordGroup, RecordPair,
    SimilarityLabel, Window,
};
