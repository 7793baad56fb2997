//! Prompt table loaded from the upstream collection file.
//!
//! The collection generator emits a JSON array with one object per
//! token. Only `token_id`, `prompt` and `rarity` are read here; trait
//! breakdowns and any other fields are ignored.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CoreError;
use crate::types::TokenId;

/// One entry of the upstream collection file.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionEntry {
    pub token_id: TokenId,
    pub prompt: String,
    #[serde(default)]
    pub rarity: Option<String>,
}

/// Prompt and display metadata for a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEntry {
    pub prompt: String,
    pub rarity: Option<String>,
}

/// Read-only mapping from [`TokenId`] to its prompt.
///
/// Every id in the table lies in `[1, collection_size]`.
#[derive(Debug, Clone)]
pub struct PromptTable {
    collection_size: TokenId,
    entries: BTreeMap<TokenId, PromptEntry>,
}

impl PromptTable {
    /// Build a table for a collection of `collection_size` tokens.
    ///
    /// Rejects a zero collection size, ids outside `[1, collection_size]`,
    /// duplicate ids and blank prompts.
    pub fn new(
        collection_size: TokenId,
        entries: impl IntoIterator<Item = CollectionEntry>,
    ) -> Result<Self, CoreError> {
        if collection_size == 0 {
            return Err(CoreError::Validation(
                "Collection size must be at least 1".to_string(),
            ));
        }

        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.token_id == 0 || entry.token_id > collection_size {
                return Err(CoreError::Validation(format!(
                    "Token id {} is outside the collection range 1..={collection_size}",
                    entry.token_id
                )));
            }
            if entry.prompt.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "Token id {} has an empty prompt",
                    entry.token_id
                )));
            }
            let token_id = entry.token_id;
            let previous = map.insert(
                token_id,
                PromptEntry {
                    prompt: entry.prompt,
                    rarity: entry.rarity,
                },
            );
            if previous.is_some() {
                return Err(CoreError::Validation(format!(
                    "Token id {token_id} appears more than once in the collection"
                )));
            }
        }

        Ok(Self {
            collection_size,
            entries: map,
        })
    }

    /// Parse the collection JSON array.
    ///
    /// When `collection_size` is `None` the size is the number of entries.
    pub fn from_json(json: &str, collection_size: Option<TokenId>) -> Result<Self, CoreError> {
        let entries: Vec<CollectionEntry> = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Malformed collection JSON: {e}")))?;
        let size = match collection_size {
            Some(size) => size,
            None => TokenId::try_from(entries.len()).map_err(|_| {
                CoreError::Validation("Collection has too many entries".to_string())
            })?,
        };
        Self::new(size, entries)
    }

    /// The collection size `N`; valid ids are `1..=N`.
    pub fn collection_size(&self) -> TokenId {
        self.collection_size
    }

    pub fn get(&self, token_id: TokenId) -> Option<&PromptEntry> {
        self.entries.get(&token_id)
    }

    pub fn contains(&self, token_id: TokenId) -> bool {
        self.entries.contains_key(&token_id)
    }

    /// Number of prompts present (may be less than the collection size).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
