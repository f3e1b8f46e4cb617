//! Durable posting progress
//!
//! This module provides:
//! - The [`Checkpoint`] record carried between runs
//! - The [`CheckpointStore`] seam used by the orchestrator
//! - A JSON file store written by atomic rename

mod file;

pub use file::FileCheckpointStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Progress marker persisted between runs.
///
/// `next_index` always names a verse that has not been confirmed delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index of the next verse to post
    #[serde(default, alias = "current_index")]
    pub next_index: usize,
    /// When the last confirmed delivery happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_posted_at: Option<DateTime<Utc>>,
    /// Number of confirmed deliveries across all runs
    #[serde(default)]
    pub total_posted: u64,
    /// Diagnostic from the most recent failed run, cleared on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Dataset size observed at the last write
    #[serde(
        default,
        alias = "total_verses",
        skip_serializing_if = "Option::is_none"
    )]
    pub dataset_size: Option<usize>,
}

impl Checkpoint {
    /// Starting point for a dataset that has never been posted from
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn at(next_index: usize) -> Self {
        Self {
            next_index,
            ..Self::default()
        }
    }

    /// Checkpoint after a confirmed delivery
    pub fn advanced(&self, next_index: usize, dataset_size: usize, now: DateTime<Utc>) -> Self {
        Self {
            next_index,
            last_posted_at: Some(now),
            total_posted: self.total_posted.saturating_add(1),
            last_error: None,
            dataset_size: Some(dataset_size),
        }
    }

    /// Same progress, annotated with a failure diagnostic
    pub fn with_error(&self, error: impl Into<String>) -> Self {
        Self {
            last_error: Some(error.into()),
            ..self.clone()
        }
    }
}

/// Storage seam for the checkpoint.
///
/// `read` returns [`Checkpoint::fresh`] when nothing has been stored yet. `write`
/// replaces the stored checkpoint as a whole; a subsequent `read` never observes
/// a partial write.
pub trait CheckpointStore {
    fn read(&self) -> Result<Checkpoint, PersistenceError>;
    fn write(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for &T {
    fn read(&self) -> Result<Checkpoint, PersistenceError> {
        (**self).read()
    }

    fn write(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        (**self).write(checkpoint)
    }
}
