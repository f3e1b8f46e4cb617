//! Message delivery to the external channel
//!
//! A [`Delivery`] sends exactly one message per call and classifies the result.
//! It never retries; the orchestrator owns the retry policy.

pub mod telegram;

pub use telegram::TelegramClient;

use std::time::Duration;

/// Classified result of a single send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The channel confirmed the message
    Success { message_id: Option<i64> },
    /// Transient failure (network, timeout, rate limit, server error)
    Retryable {
        reason: String,
        /// Server-requested wait before the next attempt
        retry_after: Option<Duration>,
    },
    /// Permanent failure (credentials, malformed request, unknown destination)
    Fatal { reason: String },
}

impl DeliveryOutcome {
    pub fn success() -> Self {
        DeliveryOutcome::Success { message_id: None }
    }

    pub fn retryable(reason: impl Into<String>) -> Self {
        DeliveryOutcome::Retryable {
            reason: reason.into(),
            retry_after: None,
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        DeliveryOutcome::Fatal {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryOutcome::Retryable { .. })
    }

    /// Failure reason, `None` on success
    pub fn reason(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Success { .. } => None,
            DeliveryOutcome::Retryable { reason, .. } | DeliveryOutcome::Fatal { reason } => {
                Some(reason)
            }
        }
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryOutcome::Success {
                message_id: Some(id),
            } => write!(f, "delivered (message {id})"),
            DeliveryOutcome::Success { message_id: None } => write!(f, "delivered"),
            DeliveryOutcome::Retryable { reason, .. } => write!(f, "retryable: {reason}"),
            DeliveryOutcome::Fatal { reason } => write!(f, "fatal: {reason}"),
        }
    }
}

/// Sends one formatted message to a destination
pub trait Delivery {
    fn send(&self, message: &str, destination: &str) -> DeliveryOutcome;
}

impl<T: Delivery + ?Sized> Delivery for &T {
    fn send(&self, message: &str, destination: &str) -> DeliveryOutcome {
        (**self).send(message, destination)
    }
}
