//! Batch orchestration loop.
//!
//! [`BatchRunner::run`] resolves the requested scope, then walks the work
//! items strictly in order:
//!
//! 1. In the default scope, skip tokens the store already has.
//! 2. Invoke the generator through the retrying, rate-limited invoker.
//! 3. Commit successes atomically; record failures and keep going.
//! 4. Stop at the first fatal error and return the partial report.

use std::time::Instant;

use agentmint_core::hashing::sha256_hex;
use agentmint_core::naming::token_label;
use agentmint_core::work_item::{RunRequest, WorkItem, WorkItemSource};
use agentmint_fal::client::GenerationClient;

use crate::error::PipelineError;
use crate::report::{AbortInfo, FailedItem, ItemError, RunReport};
use crate::retry::{InvokeOutcome, RetryingInvoker};
use crate::store::CompletionStore;

/// Drives one invocation's work items through generation and storage.
pub struct BatchRunner<'a, C> {
    source: WorkItemSource<'a>,
    store: CompletionStore,
    invoker: RetryingInvoker<C>,
}

impl<'a, C: GenerationClient> BatchRunner<'a, C> {
    pub fn new(source: WorkItemSource<'a>, store: CompletionStore, invoker: RetryingInvoker<C>) -> Self {
        Self {
            source,
            store,
            invoker,
        }
    }

    pub fn store(&self) -> &CompletionStore {
        &self.store
    }

    pub fn invoker(&self) -> &RetryingInvoker<C> {
        &self.invoker
    }

    /// Execute `request` to completion or fatal abort.
    ///
    /// Scope validation and output-directory failures are returned as
    /// errors before any remote call. Per-item failures and fatal aborts
    /// are reported in the returned [`RunReport`].
    pub async fn run(&mut self, request: &RunRequest) -> Result<RunReport, PipelineError> {
        let items = self.source.resolve(request)?;
        let mut report = RunReport::new(request.mode());

        self.store
            .ensure_root()
            .await
            .map_err(|source| self.output_dir_error(source))?;

        let swept = self
            .store
            .sweep_stale_temps()
            .await
            .map_err(|source| self.output_dir_error(source))?;
        if swept > 0 {
            tracing::info!(removed = swept, "Removed stale temp files from interrupted run");
        }

        let collection_size = self.source.collection_size();
        for &token_id in items.without_prompt() {
            tracing::warn!(
                token = %token_label(token_id, collection_size),
                "Token not found in collection, skipping",
            );
        }
        report.without_prompt = items.without_prompt().to_vec();

        let total = items.len();
        if request.skips_completed() {
            let done = self
                .store
                .count_complete(items.clone().map(|item| item.token_id))
                .await;
            tracing::info!(
                total,
                already_completed = done,
                remaining = total - done,
                "Resuming collection",
            );
        }

        tracing::info!(
            mode = report.mode,
            total,
            root = %self.store.root().display(),
            "Batch run starting",
        );

        for (index, item) in items.enumerate() {
            let position = index + 1;
            let label = token_label(item.token_id, collection_size);

            if request.skips_completed() && self.store.is_complete(item.token_id).await {
                tracing::debug!(position, total, token = %label, "Already complete, skipping");
                report.skipped.push(item.token_id);
                continue;
            }

            tracing::info!(
                position,
                total,
                token = %label,
                rarity = item.rarity.as_deref().unwrap_or("-"),
                "Generating",
            );

            let started = Instant::now();
            match self.invoker.invoke(&item).await {
                InvokeOutcome::Succeeded { bytes, attempts } => {
                    self.commit(&item, &bytes, attempts, started, &mut report).await;
                }
                InvokeOutcome::Failed { error, attempts } => {
                    tracing::error!(
                        position,
                        total,
                        token = %label,
                        attempts,
                        kind = error.kind(),
                        error = %error,
                        "Generation failed",
                    );
                    report.failed.push(FailedItem {
                        token_id: item.token_id,
                        error: ItemError::Generation(error),
                        attempts,
                    });
                }
                InvokeOutcome::FatalAbort { error, attempts } => {
                    tracing::error!(
                        position,
                        total,
                        token = %label,
                        attempts,
                        error = %error,
                        "Fatal error, aborting batch",
                    );
                    report.aborted = Some(AbortInfo {
                        token_id: item.token_id,
                        error,
                    });
                    break;
                }
            }
        }

        report.finish();

        tracing::info!(
            mode = report.mode,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            aborted = report.is_aborted(),
            "Batch run finished",
        );

        Ok(report)
    }

    async fn commit(
        &self,
        item: &WorkItem,
        bytes: &[u8],
        attempts: u32,
        started: Instant,
        report: &mut RunReport,
    ) {
        match self.store.commit(item.token_id, bytes).await {
            Ok(path) => {
                tracing::info!(
                    token_id = item.token_id,
                    attempts,
                    bytes = bytes.len(),
                    sha256 = %sha256_hex(bytes),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    path = %path.display(),
                    "Saved",
                );
                report.succeeded.push(item.token_id);
            }
            Err(e) => {
                tracing::error!(token_id = item.token_id, error = %e, "Failed to save image");
                report.failed.push(FailedItem {
                    token_id: item.token_id,
                    error: ItemError::Storage(e.to_string()),
                    attempts,
                });
            }
        }
    }

    fn output_dir_error(&self, source: std::io::Error) -> PipelineError {
        PipelineError::OutputDir {
            path: self.store.root().to_path_buf(),
            source,
        }
    }
}
