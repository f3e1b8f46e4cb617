//! Error taxonomy for a single posting run
//!
//! Every variant of [`BotError`] is fatal to the run that produced it. Delivery
//! errors additionally carry whether the underlying failure was retryable, so the
//! orchestrator can report an exhausted retry budget differently from a hard
//! rejection by the channel.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, BotError>;

/// Errors raised while loading or validating the verse dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("dataset {origin} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        origin: String,
        columns: Vec<String>,
    },

    #[error("dataset {origin} contains no verses")]
    Empty { origin: String },

    #[error("row {row} of {origin}: {reason}")]
    InvalidRow {
        origin: String,
        row: usize,
        reason: String,
    },

    #[error("row {row} of {origin}: reference {reference} already appears at row {first_row}")]
    DuplicateReference {
        origin: String,
        reference: String,
        first_row: usize,
        row: usize,
    },
}

/// Errors raised by a checkpoint store
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("checkpoint I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize checkpoint: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("checkpoint store unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for a posting run
#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("delivery failed after {attempts} attempt(s) ({}): {reason}", if *retryable { "retryable" } else { "fatal" })]
    Delivery {
        attempts: u32,
        retryable: bool,
        reason: String,
    },
}

impl BotError {
    /// Short classification label used in logs and the persisted `last_error`
    pub fn kind(&self) -> &'static str {
        match self {
            BotError::Dataset(_) => "dataset",
            BotError::InvalidState(_) => "invalid-state",
            BotError::Persistence(_) => "persistence",
            BotError::Delivery { .. } => "delivery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_message_names_classification() {
        let err = BotError::Delivery {
            attempts: 3,
            retryable: true,
            reason: "HTTP 502".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "delivery failed after 3 attempt(s) (retryable): HTTP 502"
        );

        let err = BotError::Delivery {
            attempts: 1,
            retryable: false,
            reason: "chat not found".to_string(),
        };
        assert!(err.to_string().contains("(fatal)"));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(BotError::InvalidState("x".into()).kind(), "invalid-state");
        let missing = DatasetError::Missing {
            path: PathBuf::from("quran_dataset.csv"),
        };
        assert_eq!(BotError::from(missing).kind(), "dataset");
        assert_eq!(
            BotError::from(PersistenceError::Unavailable("down".into())).kind(),
            "persistence"
        );
    }

    #[test]
    fn test_missing_columns_message_lists_columns() {
        let err = DatasetError::MissingColumns {
            origin: "data.csv".to_string(),
            columns: vec!["ayah_ar".to_string(), "surah_no".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "dataset data.csv is missing required columns: ayah_ar, surah_no"
        );
    }
}
