//! Typed request and response bodies for the fal.ai queue API.
//!
//! The queue hands back a `status_url` and a `response_url` on submit.
//! The final result JSON is model-specific, so image extraction is
//! deliberately lenient about where the image list lives.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// Generation parameters sent with every prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationParams {
    pub aspect_ratio: String,
    pub output_format: String,
    pub num_images: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            aspect_ratio: "1:1".to_string(),
            output_format: "png".to_string(),
            num_images: 1,
        }
    }
}

/// Body of `POST {queue_url}/{model}`.
#[derive(Debug, Serialize)]
pub struct SubmitRequest<'a> {
    pub prompt: &'a str,
    #[serde(flatten)]
    pub params: &'a GenerationParams,
}

/// Response to a queue submission.
///
/// All fields are optional on the wire; the client treats missing URLs
/// as a malformed response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Status polling
// ---------------------------------------------------------------------------

/// Queue status for a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    InQueue,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    /// Anything the client does not recognise; treated as still running.
    Other(String),
}

impl QueueStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "IN_QUEUE" => Self::InQueue,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether polling should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Response of `GET {status_url}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default = "unknown_status")]
    pub status: String,
    /// Error detail; a string or an object depending on the model.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

fn unknown_status() -> String {
    "UNKNOWN".to_string()
}

impl StatusResponse {
    pub fn queue_status(&self) -> QueueStatus {
        QueueStatus::parse(&self.status)
    }

    /// Human-readable error detail, `"Unknown error"` when absent.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Result extraction
// ---------------------------------------------------------------------------

/// Find the first image URL in a result payload.
///
/// Looks at `images`, then `output.images`, then `data.images`. Each
/// entry is either `{"url": ...}` or a bare URL string.
pub fn extract_image_url(result: &serde_json::Value) -> Option<String> {
    let images = non_empty_images(result.get("images")).or_else(|| {
        ["output", "data"]
            .iter()
            .filter_map(|key| result.get(*key))
            .find_map(|nested| non_empty_images(nested.get("images")))
    })?;

    match images.first()? {
        serde_json::Value::String(url) if !url.is_empty() => Some(url.clone()),
        serde_json::Value::Object(obj) => match obj.get("url") {
            Some(serde_json::Value::String(url)) if !url.is_empty() => Some(url.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn non_empty_images(value: Option<&serde_json::Value>) -> Option<&Vec<serde_json::Value>> {
    value
        .and_then(serde_json::Value::as_array)
        .filter(|images| !images.is_empty())
}
