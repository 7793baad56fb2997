//! Run scopes and the work-item source.
//!
//! A [`RunRequest`] says *which* tokens an invocation covers. The
//! [`WorkItemSource`] validates it against the prompt table and yields
//! the matching [`WorkItem`]s lazily, in order. Validation is eager so a
//! rejected request never reaches the remote service.

use std::ops::RangeInclusive;

use crate::error::CoreError;
use crate::prompts::PromptTable;
use crate::types::TokenId;

// ---------------------------------------------------------------------------
// WorkItem
// ---------------------------------------------------------------------------

/// One unit of generation work: a prompt bound to a token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub token_id: TokenId,
    pub prompt: String,
    /// Remote model identifier, e.g. `fal-ai/nano-banana`.
    pub model: String,
    /// Rarity tier from the collection, used for log context only.
    pub rarity: Option<String>,
}

// ---------------------------------------------------------------------------
// RunRequest
// ---------------------------------------------------------------------------

/// Operator-selected scope for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRequest {
    /// Contiguous inclusive range, always reprocessed.
    Range { start: TokenId, end: TokenId },
    /// Explicit ids in operator order, always reprocessed.
    Redo(Vec<TokenId>),
    /// Every token in the collection that has no saved asset yet.
    Missing,
}

impl RunRequest {
    /// Whether tokens that already have an asset are skipped.
    ///
    /// Only the default scope resumes; range and redo scopes overwrite.
    pub fn skips_completed(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Short mode name for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Range { .. } => "range",
            Self::Redo(_) => "redo",
            Self::Missing => "missing",
        }
    }
}

// ---------------------------------------------------------------------------
// WorkItemSource
// ---------------------------------------------------------------------------

/// Resolves a [`RunRequest`] into an ordered sequence of [`WorkItem`]s.
pub struct WorkItemSource<'a> {
    table: &'a PromptTable,
    model: String,
}

impl<'a> WorkItemSource<'a> {
    pub fn new(table: &'a PromptTable, model: impl Into<String>) -> Self {
        Self {
            table,
            model: model.into(),
        }
    }

    pub fn collection_size(&self) -> TokenId {
        self.table.collection_size()
    }

    /// Validate `request` and return a lazy iterator over its work items.
    ///
    /// - `Range`: `InvalidRange` unless `1 <= start <= end <= N`.
    /// - `Redo`: `UnknownTokenId` for any id outside `[1, N]` or with no
    ///   prompt.
    /// - `Range` and `Missing`: ids with no prompt are left out of the
    ///   items and listed by [`WorkItems::without_prompt`].
    pub fn resolve(&self, request: &RunRequest) -> Result<WorkItems<'a>, CoreError> {
        let max = self.table.collection_size();

        let ids = match request {
            RunRequest::Range { start, end } => {
                if *start == 0 || start > end || *end > max {
                    return Err(CoreError::InvalidRange {
                        start: *start,
                        end: *end,
                        max,
                    });
                }
                Scope::Range(*start..=*end)
            }
            RunRequest::Redo(ids) => Scope::List(ids.clone().into_iter()),
            RunRequest::Missing => Scope::Range(1..=max),
        };

        let mut without_prompt = Vec::new();
        for token_id in ids.clone() {
            let in_range = token_id != 0 && token_id <= max;
            if in_range && self.table.contains(token_id) {
                continue;
            }
            if !in_range || matches!(request, RunRequest::Redo(_)) {
                return Err(CoreError::UnknownTokenId { token_id, max });
            }
            without_prompt.push(token_id);
        }

        let remaining = ids.size_hint().0 - without_prompt.len();

        Ok(WorkItems {
            table: self.table,
            model: self.model.clone(),
            ids,
            remaining,
            without_prompt,
        })
    }
}

#[derive(Debug, Clone)]
enum Scope {
    Range(RangeInclusive<TokenId>),
    List(std::vec::IntoIter<TokenId>),
}

impl Iterator for Scope {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        match self {
            Self::Range(range) => range.next(),
            Self::List(list) => list.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Range(range) => range.size_hint(),
            Self::List(list) => list.size_hint(),
        }
    }
}

/// Lazy, ordered work items for a validated scope.
#[derive(Debug, Clone)]
pub struct WorkItems<'a> {
    table: &'a PromptTable,
    model: String,
    ids: Scope,
    remaining: usize,
    without_prompt: Vec<TokenId>,
}

impl WorkItems<'_> {
    /// Ids in the scope that have no prompt and will not be yielded.
    pub fn without_prompt(&self) -> &[TokenId] {
        &self.without_prompt
    }
}

impl Iterator for WorkItems<'_> {
    type Item = WorkItem;

    fn next(&mut self) -> Option<WorkItem> {
        loop {
            let token_id = self.ids.next()?;
            let Some(entry) = self.table.get(token_id) else {
                continue;
            };
            self.remaining -= 1;
            return Some(WorkItem {
                token_id,
                prompt: entry.prompt.clone(),
                model: self.model.clone(),
                rarity: entry.rarity.clone(),
            });
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for WorkItems<'_> {}
