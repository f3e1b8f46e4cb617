//! Post command: one orchestrated run
//!
//! Usage: ayah-bot post [--preflight]

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::checkpoint::FileCheckpointStore;
use crate::config::Config;
use crate::delivery::TelegramClient;
use crate::run::{Orchestrator, RetryPolicy, RunResult};

/// Post the next verse and advance the checkpoint on confirmed delivery.
///
/// Returns an error (non-zero exit) for any run that does not reach `Committed`.
pub fn execute(config: &Config, preflight: bool) -> Result<()> {
    config.require_token()?;
    let channel = config.require_channel()?;

    let client = TelegramClient::from_config(&config.telegram)?;
    if preflight {
        let identity = client
            .get_me()
            .context("Preflight check failed; nothing was posted")?;
        info!(bot = %identity.display_name(), "bot connected");
    }

    let orchestrator = Orchestrator::new(
        FileCheckpointStore::new(&config.state_path),
        client,
        &config.dataset_path,
        channel,
    )
    .with_retry(RetryPolicy::from(&config.retry))
    .with_markup(config.telegram.markup());

    report(orchestrator.run())
}

fn report(result: RunResult) -> Result<()> {
    let verse = result.reference.as_deref().unwrap_or("-");

    match result.error {
        None => {
            let next = result
                .checkpoint
                .as_ref()
                .map(|c| c.next_index.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{} Posted {verse} after {} attempt(s); next index {next}",
                "✓".green().bold(),
                result.attempts
            );
            Ok(())
        }
        Some(error) => {
            eprintln!(
                "{} Run {} failed in state {} (verse {verse})",
                "✗".red().bold(),
                result.run_id,
                result
                    .trace
                    .iter()
                    .rev()
                    .nth(1)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "start".to_string())
            );
            Err(anyhow::Error::new(error))
        }
    }
}
