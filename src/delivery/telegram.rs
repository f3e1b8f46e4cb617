//! Telegram Bot API delivery.
//!
//! Provides an HTTP client with bounded timeouts, `sendMessage` delivery, and
//! the `getMe` credential check. Response classification is kept in pure
//! functions so it can be tested without a network.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Delivery, DeliveryOutcome};
use crate::config::TelegramConfig;

const USER_AGENT: &str = concat!("ayah-bot/", env!("CARGO_PKG_VERSION"));

/// Create an HTTP client whose every request is bounded by the configured timeouts.
pub(crate) fn create_http_client(config: &TelegramConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

/// Envelope every Bot API method responds with
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

/// Identity returned by `getMe`
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl BotIdentity {
    /// `@username` when the bot has one, otherwise its first name
    pub fn display_name(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) => format!("@{username}"),
            (None, Some(name)) => name.clone(),
            (None, None) => format!("bot {}", self.id),
        }
    }
}

/// Classify a `sendMessage` HTTP response.
///
/// `body` is `None` when the response body was not a Bot API envelope.
pub fn classify_response(status: u16, body: Option<&ApiResponse<SentMessage>>) -> DeliveryOutcome {
    let description = body
        .and_then(|b| b.description.clone())
        .unwrap_or_else(|| "no description".to_string());

    match status {
        200..=299 => match body {
            Some(response) if response.ok => DeliveryOutcome::Success {
                message_id: response.result.as_ref().map(|m| m.message_id),
            },
            // The request may or may not have been delivered; an in-run retry
            // could double-post, so the next scheduled run decides instead.
            Some(_) => DeliveryOutcome::fatal(format!("HTTP {status} without ok: {description}")),
            None => DeliveryOutcome::fatal(format!(
                "HTTP {status} with unreadable body; delivery unconfirmed"
            )),
        },
        429 => DeliveryOutcome::Retryable {
            reason: format!("rate limited: {description}"),
            retry_after: body
                .and_then(|b| b.parameters.as_ref())
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs),
        },
        408 | 500..=599 => DeliveryOutcome::retryable(format!("HTTP {status}: {description}")),
        401 => DeliveryOutcome::fatal(format!(
            "unauthorized (check {}): {description}",
            crate::config::ENV_TOKEN
        )),
        403 => DeliveryOutcome::fatal(format!("forbidden: {description}")),
        404 => DeliveryOutcome::fatal(format!("not found: {description}")),
        400 => DeliveryOutcome::fatal(format!("bad request: {description}")),
        _ => DeliveryOutcome::fatal(format!("unexpected HTTP {status}: {description}")),
    }
}

/// Classify a transport-level failure (no HTTP response was received).
///
/// `err` must already be stripped of its URL, which embeds the bot token.
pub fn classify_transport(err: &reqwest::Error) -> DeliveryOutcome {
    if err.is_builder() {
        return DeliveryOutcome::fatal(format!("invalid request: {err}"));
    }
    if err.is_timeout() {
        return DeliveryOutcome::retryable(format!("timed out: {err}"));
    }
    if err.is_connect() {
        return DeliveryOutcome::retryable(format!("connection failed: {err}"));
    }
    DeliveryOutcome::retryable(format!("transport error: {err}"))
}

/// Telegram Bot API client
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    parse_mode: Option<String>,
}

// Token stays out of Debug output
impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("parse_mode", &self.parse_mode)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = match config.token.as_deref() {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => bail!("Telegram bot token is not configured"),
        };
        let parse_mode = match config.parse_mode.trim() {
            "" => None,
            mode if mode.eq_ignore_ascii_case("none") => None,
            mode => Some(mode.to_string()),
        };

        Ok(Self {
            client: create_http_client(config)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            parse_mode,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Verify the token by calling `getMe`
    pub fn get_me(&self) -> Result<BotIdentity> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .map_err(|e| e.without_url())
            .context("Failed to reach Telegram")?;

        let status = response.status();
        let body: ApiResponse<BotIdentity> = response
            .json()
            .map_err(|e| e.without_url())
            .with_context(|| format!("Unreadable getMe response (HTTP {})", status.as_u16()))?;

        match body.result {
            Some(identity) if body.ok => Ok(identity),
            _ => bail!(
                "getMe failed: HTTP {} - {}",
                status.as_u16(),
                body.description.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}

impl Delivery for TelegramClient {
    fn send(&self, message: &str, destination: &str) -> DeliveryOutcome {
        let payload = SendMessage {
            chat_id: destination,
            text: message,
            parse_mode: self.parse_mode.as_deref(),
            disable_web_page_preview: true,
        };

        let response = match self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
        {
            Ok(response) => response,
            Err(e) => return classify_transport(&e.without_url()),
        };

        let status = response.status().as_u16();
        let body = response.json::<ApiResponse<SentMessage>>().ok();
        let outcome = classify_response(status, body.as_ref());
        tracing::debug!(
            status,
            error_code = ?body.as_ref().and_then(|b| b.error_code),
            %outcome,
            "sendMessage responded"
        );
        outcome
    }
}
