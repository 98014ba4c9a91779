//! Domain types for the publication pipeline.

mod dataset;
mod group;
mod interest;
mod pair;

pub use dataset::{Dataset, Record};
pub use group::RecordGroup;
pub use interest::{InterestMode, InterestSet, InterestSpec, Window};
pub use pair::{RecordPair, SimilarityLabel};
