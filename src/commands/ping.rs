//! Credential check against the Bot API

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;
use crate::delivery::TelegramClient;

/// Verify the bot token with `getMe` and print the bot's identity
pub fn execute(config: &Config) -> Result<()> {
    config.require_token()?;
    let client = TelegramClient::from_config(&config.telegram)?;
    let identity = client.get_me().context("Failed to connect to Telegram bot")?;

    println!(
        "{} Bot connected: {} (id {})",
        "✓".green(),
        identity.display_name(),
        identity.id
    );
    Ok(())
}
