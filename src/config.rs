//! Runtime configuration
//!
//! Layers, lowest to highest precedence: built-in defaults, `ayah-bot.toml`,
//! environment variables, CLI flags. String values in the TOML file may
//! reference environment variables as `${VAR}` or `$VAR`.

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::format::Markup;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "ayah-bot.toml";
pub const DEFAULT_DATASET_PATH: &str = "quran_dataset.csv";
pub const DEFAULT_STATE_PATH: &str = "bot_state.json";
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub const ENV_TOKEN: &str = "BOT_TOKEN";
pub const ENV_CHANNEL: &str = "CHANNEL_ID";
pub const ENV_DATASET: &str = "AYAH_DATASET";
pub const ENV_STATE: &str = "AYAH_STATE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dataset_path: PathBuf,
    pub state_path: PathBuf,
    pub telegram: TelegramConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            telegram: TelegramConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub channel_id: Option<String>,
    pub api_base: String,
    /// `Markdown`, `MarkdownV2`, `HTML`, or empty for plain text
    pub parse_mode: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            channel_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
            parse_mode: "Markdown".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl TelegramConfig {
    /// Markup the message is rendered with; unknown modes are rejected by `validate`
    pub fn markup(&self) -> Markup {
        Markup::from_parse_mode(&self.parse_mode).unwrap_or_default()
    }
}

// Token stays out of logs and panic messages
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("channel_id", &self.channel_id)
            .field("api_base", &self.api_base)
            .field("parse_mode", &self.parse_mode)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total delivery attempts per run, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 30_000,
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, the default file if present, or defaults.
    ///
    /// Environment overrides are applied; CLI overrides are the caller's job.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let lookup = |key: &str| env::var(key).ok();

        let mut config = match explicit {
            Some(path) => Self::from_file(path, &lookup)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path, &lookup)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file, expanding environment references in string values
    pub fn from_file(path: &Path, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content, lookup)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: Config = toml::from_str(content).context("Invalid TOML")?;

        let expand = |s: &str| expand_env_vars(s, lookup);
        let dataset_path = expand(&*config.dataset_path.to_string_lossy())?;
        let state_path = expand(&*config.state_path.to_string_lossy())?;
        config.dataset_path = PathBuf::from(dataset_path);
        config.state_path = PathBuf::from(state_path);
        config.telegram.api_base = expand(config.telegram.api_base.as_str())?;
        if let Some(token) = config.telegram.token.take() {
            config.telegram.token = Some(expand(token.as_str())?);
        }
        if let Some(channel) = config.telegram.channel_id.take() {
            config.telegram.channel_id = Some(expand(channel.as_str())?);
        }

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_TOKEN) {
            self.telegram.token = Some(token);
        }
        if let Some(channel) = non_empty(ENV_CHANNEL) {
            self.telegram.channel_id = Some(channel);
        }
        if let Some(dataset) = non_empty(ENV_DATASET) {
            self.dataset_path = PathBuf::from(dataset);
        }
        if let Some(state) = non_empty(ENV_STATE) {
            self.state_path = PathBuf::from(state);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            bail!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms,
                self.retry.max_delay_ms
            );
        }
        if self.telegram.request_timeout_secs == 0 || self.telegram.connect_timeout_secs == 0 {
            bail!("telegram timeouts must be positive");
        }
        if self.telegram.api_base.trim().is_empty() {
            bail!("telegram.api_base must not be empty");
        }
        if Markup::from_parse_mode(&self.telegram.parse_mode).is_none() {
            bail!(
                "telegram.parse_mode '{}' is not one of Markdown, MarkdownV2, HTML, none",
                self.telegram.parse_mode
            );
        }
        Ok(())
    }

    /// Bot token, required for anything that talks to Telegram
    pub fn require_token(&self) -> Result<&str> {
        match self.telegram.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => bail!(
                "{ENV_TOKEN} is not set. Export it or set telegram.token in {DEFAULT_CONFIG_FILE}"
            ),
        }
    }

    /// Destination channel, required for posting
    pub fn require_channel(&self) -> Result<&str> {
        match self.telegram.channel_id.as_deref() {
            Some(channel) if !channel.trim().is_empty() => Ok(channel),
            _ => bail!(
                "{ENV_CHANNEL} is not set. Export it or set telegram.channel_id in {DEFAULT_CONFIG_FILE}"
            ),
        }
    }
}

/// Expand `${VAR}` and `$VAR` references; unknown variables are left as written
pub fn expand_env_vars(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .context("Invalid env var pattern")?;

    Ok(re
        .replace_all(s, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            name.and_then(lookup)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dataset_path, PathBuf::from("quran_dataset.csv"));
        assert_eq!(config.state_path, PathBuf::from("bot_state.json"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.telegram.parse_mode, "Markdown");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial_keeps_defaults() {
        let config = Config::from_toml(
            "state_path = \"state/progress.json\"\n[retry]\nmax_attempts = 5\n",
            &env_of(&[]),
        )
        .unwrap();
        assert_eq!(config.state_path, PathBuf::from("state/progress.json"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 2_000);
        assert_eq!(config.dataset_path, PathBuf::from("quran_dataset.csv"));
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(Config::from_toml("[retry]\nattempts = 5\n", &env_of(&[])).is_err());
    }

    #[test]
    fn test_from_toml_expands_env_references() {
        let config = Config::from_toml(
            "[telegram]\ntoken = \"${SECRET_TOKEN}\"\nchannel_id = \"$CHAN\"\n",
            &env_of(&[("SECRET_TOKEN", "123:abc"), ("CHAN", "@verses")]),
        )
        .unwrap();
        assert_eq!(config.telegram.token.as_deref(), Some("123:abc"));
        assert_eq!(config.telegram.channel_id.as_deref(), Some("@verses"));
    }

    #[test]
    fn test_expand_env_vars_leaves_unknown() {
        let lookup = env_of(&[("HOME", "/home/bot")]);
        assert_eq!(
            expand_env_vars("${HOME}/state/$MISSING.json", &lookup).unwrap(),
            "/home/bot/state/$MISSING.json"
        );
    }

    #[test]
    fn test_apply_env_overrides_file_values() {
        let mut config = Config::from_toml(
            "dataset_path = \"a.csv\"\n[telegram]\nchannel_id = \"@file\"\n",
            &env_of(&[]),
        )
        .unwrap();
        config.apply_env(&env_of(&[
            (ENV_CHANNEL, "@env"),
            (ENV_TOKEN, "t0ken"),
            (ENV_DATASET, "   "),
        ]));

        assert_eq!(config.telegram.channel_id.as_deref(), Some("@env"));
        assert_eq!(config.telegram.token.as_deref(), Some("t0ken"));
        // Blank env values do not clobber
        assert_eq!(config.dataset_path, PathBuf::from("a.csv"));
    }

    #[test]
    fn test_validate_rejects_bad_retry() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.base_delay_ms = 10;
        config.retry.max_delay_ms = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_mode_selects_markup() {
        let mut config = Config::default();
        assert_eq!(config.telegram.markup(), Markup::Markdown);

        config.telegram.parse_mode = "HTML".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.telegram.markup(), Markup::Html);

        config.telegram.parse_mode = "none".to_string();
        assert_eq!(config.telegram.markup(), Markup::Plain);

        config.telegram.parse_mode = "bbcode".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_credentials() {
        let mut config = Config::default();
        assert!(config.require_token().is_err());
        assert!(config.require_channel().is_err());

        config.telegram.token = Some("abc".to_string());
        config.telegram.channel_id = Some("-100123".to_string());
        assert_eq!(config.require_token().unwrap(), "abc");
        assert_eq!(config.require_channel().unwrap(), "-100123");
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = Config::default();
        config.telegram.token = Some("123456:SECRET".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    #[serial]
    fn test_load_explicit_file_with_process_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "[retry]\nmax_attempts = 2\n").unwrap();

        env::set_var(ENV_STATE, "/tmp/ayah-state.json");
        let loaded = Config::load(Some(path.as_path()));
        env::remove_var(ENV_STATE);

        let config = loaded.unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.state_path, PathBuf::from("/tmp/ayah-state.json"));
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file_fails() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(temp.path().join("absent.toml").as_path())).is_err());
    }
}
