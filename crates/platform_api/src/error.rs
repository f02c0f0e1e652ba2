use serde_json::Value;
use thiserror::Error;

use crate::response::NormalizedResponse;

/// Failures that prevent a [`NormalizedResponse`] from being produced.
///
/// HTTP-level failures (4xx/5xx) are not errors for plain requests; they are
/// returned as values. `StreamStatus` exists because an event stream that
/// fails to open has no stream to hand back.
#[derive(Debug, Error)]
pub enum PlatformApiError {
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("invalid header {name}")]
    InvalidHeader { name: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("connection lost: {0}")]
    Disconnected(String),

    #[error("event stream request failed with status {}", .0.status)]
    StreamStatus(Box<NormalizedResponse>),

    #[error("request was cancelled")]
    Cancelled,

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PlatformApiError {
    /// True for failures of the network path itself, as opposed to a
    /// structured answer from the server.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Disconnected(_))
    }

    /// Status carried by a rejected event-stream open, if any.
    #[must_use]
    pub fn stream_status(&self) -> Option<u16> {
        match self {
            Self::StreamStatus(response) => Some(response.status),
            _ => None,
        }
    }
}

/// Extract a human-readable message from a normalized error body.
///
/// Looks at `message`, `error` (string or `{ message }`) and `detail`, then
/// falls back to raw text, then to the canonical reason for `status`.
pub fn error_message_from_body(status: u16, body: &Value) -> String {
    let explicit = body
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| {
            body.get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
        })
        .or_else(|| body.get("detail").and_then(Value::as_str))
        .or_else(|| body.get("raw_text").and_then(Value::as_str))
        .and_then(non_empty_string);

    if let Some(message) = explicit {
        return message.to_string();
    }

    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("request failed")
        .to_string()
}

fn non_empty_string(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
