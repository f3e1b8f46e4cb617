//! Preview command: render the next post without sending it

use anyhow::{bail, Context, Result};

use crate::checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::format::render_verse;
use crate::progression::select_next;

/// Render the message for `index`, or for the checkpoint's next verse.
///
/// Never sends and never writes the checkpoint.
pub fn execute(config: &Config, index: Option<usize>) -> Result<()> {
    println!("{}", render(config, index)?);
    Ok(())
}

pub fn render(config: &Config, index: Option<usize>) -> Result<String> {
    let dataset = Dataset::load(&config.dataset_path)?;

    let checkpoint = match index {
        Some(index) => {
            if index >= dataset.len() {
                bail!(
                    "Index {index} is out of range; dataset has {} verses",
                    dataset.len()
                );
            }
            Checkpoint::at(index)
        }
        None => FileCheckpointStore::new(&config.state_path)
            .read()
            .context("Failed to read checkpoint")?,
    };

    let selection = select_next(&checkpoint, dataset.len())?;
    let record = dataset
        .get(selection.record_index)
        .context("Selected verse missing from dataset")?;
    Ok(render_verse(record, dataset.len(), config.telegram.markup()))
}
