//! Common utility functions shared across command implementations.
//!
//! This module provides utilities for:
//! - Resolving configuration with CLI overrides
//! - String truncation for display

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;

/// Values given on the command line, applied on top of file and env configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub dataset: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub channel: Option<String>,
}

/// Load configuration and apply CLI overrides
pub fn resolve_config(overrides: &Overrides) -> Result<Config> {
    let mut config = Config::load(overrides.config.as_deref())?;
    overrides.apply(&mut config);
    Ok(config)
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dataset) = &self.dataset {
            config.dataset_path = dataset.clone();
        }
        if let Some(state) = &self.state {
            config.state_path = state.clone();
        }
        if let Some(channel) = &self.channel {
            config.telegram.channel_id = Some(channel.clone());
        }
    }
}

/// Truncate a string for single-line display, appending an ellipsis when shortened
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}
