//! Error types for the widget runtime.

use thiserror::Error;

/// Widget runtime error type.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An operation that requires a canonical conversation id received a
    /// local placeholder.
    #[error("conversation id is not canonical: {0}")]
    NotCanonical(String),
    /// Durable key-value storage error.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Request exceeded its deadline.
    #[error("request timed out")]
    Timeout,
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Malformed collaborator payload.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl WidgetError {
    /// Whether this failure is transient and the operation may be retried
    /// on a later trigger. No automatic retry loop exists; the chat stays
    /// usable with degraded history or context.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout)
    }
}

/// Convenience result alias for widget operations.
pub type WidgetResult<T> = Result<T, WidgetError>;
