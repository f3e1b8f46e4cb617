//! Status command: checkpoint and upcoming verse

use anyhow::{Context, Result};
use colored::Colorize;

use super::common::truncate;
use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::progression::select_next;

/// Show the stored checkpoint and which verse the next run would post
pub fn execute(config: &Config) -> Result<()> {
    let store = FileCheckpointStore::new(&config.state_path);
    let checkpoint = store.read().context("Failed to read checkpoint")?;

    println!("{}", "ayah-bot status".bold().blue());
    println!("{}", "=".repeat(50));

    println!("\n{}", "Checkpoint".bold());
    println!("  File:         {}", config.state_path.display());
    println!("  Next index:   {}", checkpoint.next_index);
    println!("  Total posted: {}", checkpoint.total_posted);
    match checkpoint.last_posted_at {
        Some(at) => println!("  Last posted:  {}", at.to_rfc3339()),
        None => println!("  Last posted:  {}", "never".dimmed()),
    }
    if let Some(error) = &checkpoint.last_error {
        println!("  Last error:   {}", truncate(error, 120).red());
    }

    println!("\n{}", "Dataset".bold());
    println!("  File:         {}", config.dataset_path.display());
    match Dataset::load(&config.dataset_path) {
        Ok(dataset) => {
            println!("  Verses:       {}", dataset.len());
            let selection = select_next(&checkpoint, dataset.len())?;
            if let Some(record) = dataset.get(selection.record_index) {
                println!(
                    "  Up next:      {} ({}/{})",
                    record.to_string().green(),
                    selection.record_index + 1,
                    dataset.len()
                );
            }
            if selection.wrapped {
                println!(
                    "  {}",
                    "Stored index is past the end; the next run restarts from the beginning"
                        .yellow()
                );
            }
        }
        Err(e) => println!("  {}", format!("Unavailable: {e}").red()),
    }

    println!();
    Ok(())
}
