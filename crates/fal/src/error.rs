//! Failure taxonomy for remote generation calls.
//!
//! Raw transport and HTTP errors are folded into four kinds so the retry
//! layer can apply policy without knowing anything about HTTP.

use std::time::Duration;

use crate::api::FalApiError;

/// Classified failure of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// 5xx, timeout, connection reset, malformed queue response. Retryable.
    #[error("Transient service error: {0}")]
    Transient(String),

    /// 429. Retryable, honouring the server hint when present.
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Any other 4xx. Terminal for the item.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or rejected credential. Fatal for the whole run.
    #[error("Authentication failed: {0}")]
    Authentication(String),
}

impl GenerationError {
    /// Whether another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited { .. })
    }

    /// Whether the whole batch should stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Server-provided delay before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short kind name for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Authentication(_) => "authentication",
        }
    }
}

/// Classify a non-2xx HTTP response.
pub fn classify_status(status: u16, body: &str, retry_after: Option<Duration>) -> GenerationError {
    let detail = format!("HTTP {status}: {}", truncate(body, 500));
    match status {
        401 | 403 => GenerationError::Authentication(detail),
        429 => GenerationError::RateLimited {
            message: detail,
            retry_after,
        },
        408 | 500..=599 => GenerationError::Transient(detail),
        400..=499 => GenerationError::InvalidRequest(detail),
        // 1xx/3xx leaking through is a service anomaly, not a client bug.
        _ => GenerationError::Transient(detail),
    }
}

impl From<FalApiError> for GenerationError {
    fn from(err: FalApiError) -> Self {
        match err {
            FalApiError::ApiError {
                status,
                body,
                retry_after,
            } => classify_status(status, &body, retry_after),
            FalApiError::Request(e) => match e.status() {
                Some(status) => classify_status(status.as_u16(), &e.to_string(), None),
                None => GenerationError::Transient(e.to_string()),
            },
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
