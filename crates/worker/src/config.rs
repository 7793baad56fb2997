//! Worker configuration loaded from environment variables.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use agentmint_core::types::TokenId;
use agentmint_fal::client::{
    FalConfig, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_MODEL, DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_URL,
};
use agentmint_pipeline::rate_limit::DEFAULT_REQUEST_DELAY;
use agentmint_pipeline::retry::RetryPolicy;

pub const DEFAULT_COLLECTION_PATH: &str = "output/full_collection.json";
pub const DEFAULT_IMAGES_DIR: &str = "output/images";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings for a generation run.
#[derive(Clone)]
pub struct WorkerConfig {
    pub fal_key: String,
    pub model: String,
    pub queue_url: String,
    pub collection_path: PathBuf,
    pub images_dir: PathBuf,
    /// Collection size `N`. `None` means the number of entries in the
    /// collection file.
    pub collection_size: Option<TokenId>,
    pub request_delay: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                       |
    /// |-------------------------|-------------------------------|
    /// | `FAL_KEY`               | required                      |
    /// | `FAL_MODEL`             | `fal-ai/nano-banana`          |
    /// | `FAL_QUEUE_URL`         | `https://queue.fal.run`       |
    /// | `COLLECTION_PATH`       | `output/full_collection.json` |
    /// | `IMAGES_DIR`            | `output/images`               |
    /// | `COLLECTION_SIZE`       | entries in the collection     |
    /// | `REQUEST_DELAY_SECS`    | `1.0`                         |
    /// | `POLL_INTERVAL_SECS`    | `2.0`                         |
    /// | `MAX_POLL_ATTEMPTS`     | `150`                         |
    /// | `MAX_ATTEMPTS`          | `4`                           |
    /// | `RETRY_BASE_DELAY_SECS` | `2.0`                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let fal_key = var("FAL_KEY").ok_or(ConfigError::Missing("FAL_KEY"))?;
        let default_policy = RetryPolicy::default();

        Ok(Self {
            fal_key,
            model: var("FAL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            queue_url: var("FAL_QUEUE_URL").unwrap_or_else(|| DEFAULT_QUEUE_URL.into()),
            collection_path: var("COLLECTION_PATH")
                .unwrap_or_else(|| DEFAULT_COLLECTION_PATH.into())
                .into(),
            images_dir: var("IMAGES_DIR")
                .unwrap_or_else(|| DEFAULT_IMAGES_DIR.into())
                .into(),
            collection_size: var("COLLECTION_SIZE")
                .map(|v| parse_positive("COLLECTION_SIZE", &v))
                .transpose()?,
            request_delay: duration_var(var("REQUEST_DELAY_SECS"), "REQUEST_DELAY_SECS")?
                .unwrap_or(DEFAULT_REQUEST_DELAY),
            poll_interval: duration_var(var("POLL_INTERVAL_SECS"), "POLL_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            max_poll_attempts: var("MAX_POLL_ATTEMPTS")
                .map(|v| parse_positive("MAX_POLL_ATTEMPTS", &v))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS),
            max_attempts: var("MAX_ATTEMPTS")
                .map(|v| parse_positive("MAX_ATTEMPTS", &v))
                .transpose()?
                .unwrap_or(default_policy.max_attempts),
            retry_base_delay: duration_var(var("RETRY_BASE_DELAY_SECS"), "RETRY_BASE_DELAY_SECS")?
                .unwrap_or(default_policy.base_delay),
        })
    }

    /// Client settings for the fal.ai queue.
    pub fn fal_config(&self) -> FalConfig {
        FalConfig {
            queue_url: self.queue_url.clone(),
            poll_interval: self.poll_interval,
            max_poll_attempts: self.max_poll_attempts,
            ..FalConfig::new(self.fal_key.clone())
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.retry_base_delay,
            ..RetryPolicy::default()
        }
    }
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("fal_key", &"<redacted>")
            .field("model", &self.model)
            .field("queue_url", &self.queue_url)
            .field("collection_path", &self.collection_path)
            .field("images_dir", &self.images_dir)
            .field("collection_size", &self.collection_size)
            .field("request_delay", &self.request_delay)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .finish()
    }
}

/// Parse a non-negative number of seconds, e.g. `1.5`.
pub fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason,
    };
    let secs = f64::from_str(value.trim()).map_err(|e| invalid(e.to_string()))?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid("must be a non-negative number of seconds".into()))
}

fn duration_var(value: Option<String>, var: &'static str) -> Result<Option<Duration>, ConfigError> {
    value.map(|v| parse_secs(var, &v)).transpose()
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: fmt::Display,
{
    let invalid = |reason: String| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason,
    };
    let parsed = T::from_str(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if parsed <= T::default() {
        return Err(invalid("must be at least 1".into()));
    }
    Ok(parsed)
}
