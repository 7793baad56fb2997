//! The generation seam and its fal.ai implementation.
//!
//! [`GenerationClient`] is what the batch pipeline calls: one prompt in,
//! image bytes or a classified [`GenerationError`] out. [`FalClient`]
//! implements it by driving the full queue cycle (submit, poll, fetch,
//! download) for a single item.

use std::time::Duration;

use agentmint_core::work_item::WorkItem;
use async_trait::async_trait;

use crate::api::FalQueueApi;
use crate::error::GenerationError;
use crate::messages::{extract_image_url, GenerationParams, QueueStatus};
use crate::payload::sniff_image;

/// Default queue base URL.
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "fal-ai/nano-banana";
/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Default poll budget per request (~5 minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 150;
/// Default timeout for queue REST calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default timeout for the image download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A remote image generator.
///
/// One call is one logical request for one item. Implementations must
/// not retry internally; retry policy belongs to the caller.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, item: &WorkItem) -> Result<Vec<u8>, GenerationError>;
}

/// Connection settings for [`FalClient`].
///
/// The credential is passed in explicitly; the client never reads the
/// process environment.
#[derive(Debug, Clone)]
pub struct FalConfig {
    pub api_key: String,
    pub queue_url: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub params: GenerationParams,
}

impl FalConfig {
    /// Settings with production defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            params: GenerationParams::default(),
        }
    }
}

/// fal.ai queue-backed [`GenerationClient`].
pub struct FalClient {
    api: FalQueueApi,
    poll_interval: Duration,
    max_poll_attempts: u32,
    params: GenerationParams,
}

impl FalClient {
    /// Build a client. An empty credential is rejected up front as an
    /// [`GenerationError::Authentication`] so no quota is spent.
    pub fn new(config: FalConfig) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Authentication(
                "fal.ai API key is empty".to_string(),
            ));
        }

        let api = FalQueueApi::new(
            config.queue_url,
            config.api_key,
            config.request_timeout,
            config.download_timeout,
        );

        Ok(Self {
            api,
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts.max(1),
            params: config.params,
        })
    }

    /// Poll `status_url` until the request reaches a terminal state.
    async fn wait_for_completion(&self, status_url: &str) -> Result<(), GenerationError> {
        for poll in 1..=self.max_poll_attempts {
            let status = self.api.status(status_url).await?;
            match status.queue_status() {
                QueueStatus::Completed => {
                    tracing::debug!(polls = poll, "Queue request completed");
                    return Ok(());
                }
                QueueStatus::Failed | QueueStatus::Cancelled => {
                    return Err(GenerationError::Transient(format!(
                        "Request {}: {}",
                        status.status,
                        status.error_message()
                    )));
                }
                QueueStatus::InQueue | QueueStatus::InProgress | QueueStatus::Other(_) => {
                    tracing::trace!(poll, status = %status.status, "Queue request pending");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(GenerationError::Transient(format!(
            "Request did not complete after {} polls",
            self.max_poll_attempts
        )))
    }
}

#[async_trait]
impl GenerationClient for FalClient {
    async fn generate(&self, item: &WorkItem) -> Result<Vec<u8>, GenerationError> {
        // Step 1: submit to the queue.
        let submitted = self
            .api
            .submit(&item.model, &item.prompt, &self.params)
            .await?;

        let (Some(status_url), Some(response_url)) =
            (submitted.status_url.as_deref(), submitted.response_url.as_deref())
        else {
            return Err(GenerationError::Transient(format!(
                "Missing status/response URLs in queue response (request_id: {})",
                submitted.request_id.as_deref().unwrap_or("?")
            )));
        };

        tracing::debug!(
            token_id = item.token_id,
            request_id = submitted.request_id.as_deref().unwrap_or("?"),
            model = %item.model,
            "Queued generation request",
        );

        // Step 2: poll until done.
        self.wait_for_completion(status_url).await?;

        // Step 3: fetch the result and find the image.
        let result = self.api.result(response_url).await?;
        let image_url = extract_image_url(&result).ok_or_else(|| {
            let raw: String = result.to_string().chars().take(500).collect();
            GenerationError::Transient(format!("No image URL in response: {raw}"))
        })?;

        // Step 4: download and sanity-check the payload.
        let bytes = self.api.download(&image_url).await?;
        let (width, height) = sniff_image(&bytes)?;

        tracing::debug!(
            token_id = item.token_id,
            bytes = bytes.len(),
            width,
            height,
            "Downloaded generated image",
        );

        Ok(bytes)
    }
}
