//! Next-verse selection
//!
//! The dataset is cyclic: after the last verse, posting resumes at verse 0.
//! The stored `next_index` is always normalized into `0..dataset_size`.

use crate::checkpoint::Checkpoint;
use crate::error::{BotError, Result};

/// Outcome of selecting the verse for this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Verse to post now
    pub record_index: usize,
    /// Value `next_index` takes once that verse is confirmed delivered
    pub next_index: usize,
    /// True when the stored index had run past the end and was wrapped
    pub wrapped: bool,
}

/// Compute which verse to post and where the checkpoint moves on success.
///
/// Pure and deterministic: the same checkpoint and size always give the same
/// selection.
pub fn select_next(checkpoint: &Checkpoint, dataset_size: usize) -> Result<Selection> {
    if dataset_size == 0 {
        return Err(BotError::InvalidState(
            "dataset is empty; nothing to select".to_string(),
        ));
    }

    let record_index = checkpoint.next_index % dataset_size;
    let next_index = (record_index + 1) % dataset_size;

    Ok(Selection {
        record_index,
        next_index,
        wrapped: checkpoint.next_index >= dataset_size,
    })
}
