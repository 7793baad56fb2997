//! REST wrapper for the fal.ai queue endpoints.
//!
//! Wraps submission, status polling, result retrieval and the final
//! image download using [`reqwest`]. No retry logic lives here; every
//! method performs exactly one HTTP request.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, RETRY_AFTER};

use crate::messages::{GenerationParams, StatusResponse, SubmitRequest, SubmitResponse};

/// HTTP client for the fal.ai queue.
pub struct FalQueueApi {
    client: reqwest::Client,
    queue_url: String,
    api_key: String,
    request_timeout: Duration,
    download_timeout: Duration,
}

/// Errors from the queue REST layer.
#[derive(Debug, thiserror::Error)]
pub enum FalApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// fal.ai returned a non-2xx status code.
    #[error("fal.ai API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
        /// Parsed `Retry-After` header, when the server sent seconds.
        retry_after: Option<Duration>,
    },
}

impl FalQueueApi {
    /// Create a queue client.
    ///
    /// * `queue_url` - base URL, e.g. `https://queue.fal.run`.
    /// * `api_key`   - credential sent as `Authorization: Key <api_key>`.
    pub fn new(
        queue_url: String,
        api_key: String,
        request_timeout: Duration,
        download_timeout: Duration,
    ) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            queue_url,
            api_key,
            request_timeout,
            download_timeout,
        )
    }

    /// Create a queue client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        queue_url: String,
        api_key: String,
        request_timeout: Duration,
        download_timeout: Duration,
    ) -> Self {
        Self {
            client,
            queue_url: queue_url.trim_end_matches('/').to_string(),
            api_key,
            request_timeout,
            download_timeout,
        }
    }

    /// Submission endpoint for `model`, e.g. `https://queue.fal.run/fal-ai/nano-banana`.
    pub fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.queue_url, model.trim_matches('/'))
    }

    /// Queue a generation request.
    ///
    /// Sends `POST {queue_url}/{model}` with the prompt and parameters.
    pub async fn submit(
        &self,
        model: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<SubmitResponse, FalApiError> {
        let response = self
            .client
            .post(self.model_url(model))
            .header(AUTHORIZATION, self.auth_value())
            .timeout(self.request_timeout)
            .json(&SubmitRequest { prompt, params })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the queue status of a submitted request.
    pub async fn status(&self, status_url: &str) -> Result<StatusResponse, FalApiError> {
        let response = self
            .client
            .get(status_url)
            .header(AUTHORIZATION, self.auth_value())
            .query(&[("logs", "1")])
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the final result JSON of a completed request.
    pub async fn result(&self, response_url: &str) -> Result<serde_json::Value, FalApiError> {
        let response = self
            .client
            .get(response_url)
            .header(AUTHORIZATION, self.auth_value())
            .timeout(self.request_timeout)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download a generated image. The CDN URL needs no credential.
    pub async fn download(&self, image_url: &str) -> Result<Vec<u8>, FalApiError> {
        let response = self
            .client
            .get(image_url)
            .timeout(self.download_timeout)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    fn auth_value(&self) -> String {
        format!("Key {}", self.api_key)
    }

    /// Ensure the response has a success status code, capturing status,
    /// body and `Retry-After` on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, FalApiError> {
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FalApiError::ApiError {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FalApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds.
///
/// HTTP-date values are not supported and yield `None`, which makes the
/// retry layer fall back to its own backoff schedule.
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(queue_url: &str) -> FalQueueApi {
        FalQueueApi::new(
            queue_url.to_string(),
            "secret".to_string(),
            Duration::from_secs(30),
            Duration::from_secs(120),
        )
    }

    #[test]
    fn model_url_joins_cleanly() {
        assert_eq!(
            api("https://queue.fal.run").model_url("fal-ai/nano-banana"),
            "https://queue.fal.run/fal-ai/nano-banana"
        );
        assert_eq!(
            api("https://queue.fal.run/").model_url("/fal-ai/flux/dev"),
            "https://queue.fal.run/fal-ai/flux/dev"
        );
    }

    #[test]
    fn auth_header_format() {
        assert_eq!(api("http://x").auth_value(), "Key secret");
    }

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn retry_after_rejects_dates_and_negatives() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-3"), None);
        assert_eq!(parse_retry_after("inf"), None);
        assert_eq!(parse_retry_after("NaN"), None);
    }

    #[test]
    fn retry_after_out_of_range_is_ignored() {
        assert_eq!(parse_retry_after("1e30"), None);
        assert_eq!(
            parse_retry_after("1e9"),
            Some(Duration::from_secs(1_000_000_000))
        );
    }
}
