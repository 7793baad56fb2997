//! Outcome summary of a single batch run.

use agentmint_core::types::{TokenId, Timestamp};
use agentmint_fal::error::GenerationError;

/// Final error recorded for a failed item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The image was generated but could not be committed to disk.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ItemError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generation(e) => e.kind(),
            Self::Storage(_) => "storage",
        }
    }
}

/// An item that exhausted its attempts or failed terminally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub token_id: TokenId,
    pub error: ItemError,
    pub attempts: u32,
}

/// Marker set when a fatal error stopped the batch early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortInfo {
    /// Item being processed when the run stopped.
    pub token_id: TokenId,
    pub error: GenerationError,
}

/// Ordered record of what happened to every item a run reached.
///
/// Lists preserve processing order. Items after a fatal abort appear in
/// none of them.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub mode: &'static str,
    pub succeeded: Vec<TokenId>,
    pub failed: Vec<FailedItem>,
    pub skipped: Vec<TokenId>,
    /// Ids in a range or default scope with no prompt in the collection.
    pub without_prompt: Vec<TokenId>,
    pub aborted: Option<AbortInfo>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl RunReport {
    pub fn new(mode: &'static str) -> Self {
        Self {
            mode,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            without_prompt: Vec::new(),
            aborted: None,
            started_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn failed_ids(&self) -> Vec<TokenId> {
        self.failed.iter().map(|f| f.token_id).collect()
    }

    /// Failed ids formatted for the `--redo` flag, e.g. `3,17,42`.
    pub fn redo_argument(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let ids: Vec<String> = self.failed.iter().map(|f| f.token_id.to_string()).collect();
        Some(ids.join(","))
    }

    /// Number of items the run reached (skipped included).
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    /// Wall-clock duration, once the run has finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now());
    }
}
