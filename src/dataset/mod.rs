//! Verse dataset: ordered, immutable records in posting order

mod loader;
mod record;

pub use loader::{load_csv, parse_csv, REQUIRED_COLUMNS};
pub use record::VerseRecord;

use std::path::Path;

use crate::error::DatasetError;

/// Read-only, order-preserving collection of verses.
///
/// Loading the same source always yields the same sequence, so a stored index
/// refers to the same verse across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<VerseRecord>,
}

impl Dataset {
    /// Load and validate a CSV dataset from disk
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let records = load_csv(path)?;
        tracing::debug!(path = %path.display(), verses = records.len(), "dataset loaded");
        Ok(Self { records })
    }

    /// Build a dataset from already-constructed records.
    ///
    /// Indices are reassigned to match position. An empty dataset is allowed
    /// here; selection rejects it.
    pub fn from_records(records: Vec<VerseRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| VerseRecord { index, ..record })
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a verse by zero-based index
    pub fn get(&self, index: usize) -> Option<&VerseRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VerseRecord> {
        self.records.iter()
    }
}
