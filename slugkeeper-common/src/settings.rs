//! Configuration primitives shared by the orchestrator and its tests: list parsing,
//! the resolved webhook target and the fatal errors raised before reconciliation starts.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DO_API_TOKEN environment variable is not set")]
    MissingCredential,
    #[error("at least one region must be configured")]
    NoRegions,
    #[error("missing required value: {0}")]
    MissingValue(&'static str),
    #[error("invalid webhook url '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

/// Body shape expected by the webhook destination.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebhookFormat {
    /// Raw event JSON.
    Json,
    /// Chat webhook: `{ "text": "..." }`.
    Slack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    pub url: String,
    pub format: WebhookFormat,
}

impl WebhookTarget {
    /// Returns `None` for an absent or blank url (notifications disabled).
    pub fn new(url: Option<&str>, format: WebhookFormat) -> Option<Self> {
        let url = url.map(str::trim).filter(|u| !u.is_empty())?;
        Some(Self {
            url: url.to_string(),
            format,
        })
    }
}

/// Parse a comma-separated list.
///
/// - Trims whitespace
/// - Drops empty entries
/// - Accepts several raw values (repeated flags) and flattens them in order
pub fn parse_list<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|s| s.as_ref().split(','))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
