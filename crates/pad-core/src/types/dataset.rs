//! Records and datasets.
//!
//! A [`Dataset`] is an ordered collection of [`Record`]s. Order is preserved
//! end-to-end: the sanitized dataset lists the same keys in the same order.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{PadError, PadResult};

/// One row: a fixed-length numeric profile identified by a stable key.
///
/// Metadata columns travel with the record but never take part in
/// distance computation or sanitization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identifier of the row.
    pub key: String,

    /// Profile values (one per time slot).
    pub values: Vec<f64>,

    /// Metadata columns, excluded from distance computation.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Record {
    /// Create a record without metadata.
    pub fn new(key: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            key: key.into(),
            values,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata column.
    #[must_use]
    pub fn with_metadata(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(column.into(), value.into());
        self
    }

    /// Number of profile values.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Ordered collection of records sharing one dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Optional labels for the value columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,

    /// Rows in publication order.
    pub records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset from records.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            columns: Vec::new(),
            records,
        }
    }

    /// Create a dataset from raw vectors, keyed `"0"`, `"1"`, ...
    pub fn from_vectors(vectors: Vec<Vec<f64>>) -> Self {
        Self::new(
            vectors
                .into_iter()
                .enumerate()
                .map(|(i, values)| Record::new(i.to_string(), values))
                .collect(),
        )
    }

    /// Set column labels.
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the dataset has no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dimension of the first record, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.records.first().map(Record::dimension)
    }

    /// Borrow every record's values in dataset order.
    pub fn vectors(&self) -> Vec<&[f64]> {
        self.records.iter().map(|r| r.values.as_slice()).collect()
    }

    /// Record keys in dataset order.
    pub fn keys(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.key.as_str()).collect()
    }

    /// Check structural consistency and return the shared dimension.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if:
    /// - the dataset is empty
    /// - a record has no values or a different dimension than the first
    /// - a value is NaN or infinite
    /// - a key is empty or appears twice
    /// - column labels are given but do not match the dimension
    pub fn validate(&self) -> PadResult<usize> {
        let dimension = match self.dimension() {
            None => return Err(PadError::validation("dataset contains no records")),
            Some(0) => return Err(PadError::validation("records must have at least one value")),
            Some(d) => d,
        };

        if !self.columns.is_empty() && self.columns.len() != dimension {
            return Err(PadError::validation(format!(
                "{} column labels given for dimension {}",
                self.columns.len(),
                dimension
            )));
        }

        let mut seen = HashSet::with_capacity(self.records.len());
        for (index, record) in self.records.iter().enumerate() {
            if record.key.is_empty() {
                return Err(PadError::validation(format!(
                    "record at position {} has an empty key",
                    index
                )));
            }
            if !seen.insert(record.key.as_str()) {
                return Err(PadError::validation(format!(
                    "duplicate record key '{}'",
                    record.key
                )));
            }
            if record.dimension() != dimension {
                return Err(PadError::validation(format!(
                    "record '{}' has dimension {}, expected {}",
                    record.key,
                    record.dimension(),
                    dimension
                )));
            }
            if let Some(pos) = record.values.iter().position(|v| !v.is_finite()) {
                return Err(PadError::validation(format!(
                    "record '{}' has a non-finite value at column {}",
                    record.key, pos
                )));
            }
        }

        Ok(dimension)
    }

    /// Copy the records at `indices` (in the given order).
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }

    /// Replace every record's values, keeping keys, order and metadata.
    ///
    /// # Errors
    ///
    /// Returns `PadError::Validation` if the number of vectors differs from
    /// the number of records.
    pub fn with_values(&self, values: Vec<Vec<f64>>) -> PadResult<Dataset> {
        if values.len() != self.records.len() {
            return Err(PadError::validation(format!(
                "{} replacement vectors for {} records",
                values.len(),
                self.records.len()
            )));
        }

        let records = self
            .records
            .iter()
            .zip(values)
            .map(|(record, values)| Record {
                key: record.key.clone(),
                values,
                metadata: record.metadata.clone(),
            })
            .collect();

        Ok(Dataset {
            columns: self.columns.clone(),
            records,
        })
    }
}
