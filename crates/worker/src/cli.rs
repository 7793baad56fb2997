//! Operator command-line flags.

use std::time::Duration;

use agentmint_core::types::TokenId;
use agentmint_core::work_item::RunRequest;
use clap::Parser;

use crate::config::{parse_secs, ConfigError};

/// Generate collection images via the fal.ai queue.
///
/// With no scope flags, every token without a saved image is generated.
#[derive(Debug, Parser)]
#[command(name = "agentmint-worker")]
#[command(about = "Batch image generation for the agent collection", long_about = None)]
pub struct Args {
    /// First token id of a range (regenerates existing images)
    #[arg(long, requires = "end")]
    pub start: Option<TokenId>,

    /// Last token id of a range, inclusive
    #[arg(long, requires = "start")]
    pub end: Option<TokenId>,

    /// Comma-separated token ids to regenerate, e.g. `3,17,42`
    #[arg(long, value_delimiter = ',', num_args = 1.., conflicts_with_all = ["start", "end"])]
    pub redo: Option<Vec<TokenId>>,

    /// fal.ai model id (overrides FAL_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Seconds between remote requests (overrides REQUEST_DELAY_SECS)
    #[arg(long)]
    pub delay: Option<String>,
}

impl Args {
    /// The run scope selected by the flags.
    pub fn run_request(&self) -> RunRequest {
        match (&self.redo, self.start, self.end) {
            (Some(ids), _, _) => RunRequest::Redo(ids.clone()),
            (None, Some(start), Some(end)) => RunRequest::Range { start, end },
            _ => RunRequest::Missing,
        }
    }

    /// Rate-limiter spacing override, if given.
    pub fn delay(&self) -> Result<Option<Duration>, ConfigError> {
        self.delay
            .as_deref()
            .map(|v| parse_secs("--delay", v))
            .transpose()
    }
}
