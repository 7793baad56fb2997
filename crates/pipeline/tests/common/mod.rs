//! Shared helpers for pipeline integration tests.
//!
//! [`ScriptedClient`] stands in for the remote generator: each token id
//! gets a queue of scripted results, and every call is counted and its
//! start time recorded so tests can assert on call volume and spacing.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentmint_core::prompts::{CollectionEntry, PromptTable};
use agentmint_core::types::TokenId;
use agentmint_core::work_item::{WorkItem, WorkItemSource};
use agentmint_fal::client::GenerationClient;
use agentmint_fal::error::GenerationError;
use agentmint_pipeline::rate_limit::RateLimiter;
use agentmint_pipeline::retry::{RetryPolicy, RetryingInvoker};
use agentmint_pipeline::runner::BatchRunner;
use agentmint_pipeline::store::CompletionStore;
use async_trait::async_trait;
use tokio::time::Instant;

pub const MODEL: &str = "fal-ai/nano-banana";

/// Bytes returned by a successful scripted call for `token_id`.
pub fn image_for(token_id: TokenId) -> Vec<u8> {
    format!("image-{token_id}").into_bytes()
}

#[derive(Default)]
struct Script {
    results: HashMap<TokenId, VecDeque<Result<Vec<u8>, GenerationError>>>,
    calls: Vec<TokenId>,
    started: Vec<Instant>,
    finished: Vec<Instant>,
    latency: Duration,
}

/// Generator whose results are scripted per token. Unscripted calls
/// succeed with [`image_for`].
#[derive(Clone, Default)]
pub struct ScriptedClient {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `results` for `token_id`, consumed one per call.
    pub fn script(&self, token_id: TokenId, results: Vec<Result<Vec<u8>, GenerationError>>) {
        self.inner
            .lock()
            .unwrap()
            .results
            .insert(token_id, results.into());
    }

    /// Make every call take `latency` of (tokio) time before returning.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.lock().unwrap().latency = latency;
        self
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    pub fn calls(&self) -> Vec<TokenId> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, token_id: TokenId) -> usize {
        self.calls().iter().filter(|&&t| t == token_id).count()
    }

    pub fn start_times(&self) -> Vec<Instant> {
        self.inner.lock().unwrap().started.clone()
    }

    pub fn finish_times(&self) -> Vec<Instant> {
        self.inner.lock().unwrap().finished.clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, item: &WorkItem) -> Result<Vec<u8>, GenerationError> {
        let (result, latency) = {
            let mut script = self.inner.lock().unwrap();
            script.calls.push(item.token_id);
            script.started.push(Instant::now());
            let result = script
                .results
                .get_mut(&item.token_id)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| Ok(image_for(item.token_id)));
            (result, script.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.inner.lock().unwrap().finished.push(Instant::now());
        result
    }
}

pub fn transient() -> GenerationError {
    GenerationError::Transient("HTTP 503: upstream unavailable".to_string())
}

pub fn invalid() -> GenerationError {
    GenerationError::InvalidRequest("HTTP 422: prompt rejected".to_string())
}

pub fn unauthorized() -> GenerationError {
    GenerationError::Authentication("HTTP 401: invalid key".to_string())
}

/// Dense prompt table for tokens `1..=size`.
pub fn table(size: TokenId) -> PromptTable {
    let entries = (1..=size).map(|token_id| CollectionEntry {
        token_id,
        prompt: format!("chibi agent #{token_id}"),
        rarity: Some(if token_id % 10 == 0 { "rare" } else { "common" }.to_string()),
    });
    PromptTable::new(size, entries).unwrap()
}

/// Retry policy with the production schedule.
pub fn policy() -> RetryPolicy {
    RetryPolicy::default()
}

/// Runner over `table` writing into `root`, with a `delay`-spaced limiter.
pub fn runner<'a>(
    table: &'a PromptTable,
    root: &Path,
    client: ScriptedClient,
    delay: Duration,
) -> BatchRunner<'a, ScriptedClient> {
    let source = WorkItemSource::new(table, MODEL);
    let store = CompletionStore::new(root, table.collection_size());
    let invoker = RetryingInvoker::new(client, policy(), RateLimiter::new(delay));
    BatchRunner::new(source, store, invoker)
}
