//! Filesystem-backed completion store.
//!
//! A token is complete when a non-empty regular file exists at its
//! canonical path. Writes go to a hidden temp file in the same directory
//! and are renamed into place only after a full write and fsync, so a
//! killed process can never leave a partial asset at a canonical path.

use std::io;
use std::path::{Path, PathBuf};

use agentmint_core::naming::{asset_filename, pad_width, DEFAULT_EXTENSION};
use agentmint_core::types::TokenId;
use tokio::io::AsyncWriteExt;

/// Suffix of in-flight temp files.
const TEMP_SUFFIX: &str = ".part";

/// Errors from [`CompletionStore::commit`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An empty payload can never count as complete, so it is refused.
    #[error("Refusing to commit empty payload for token {0}")]
    EmptyPayload(TokenId),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Owner of the output directory namespace.
#[derive(Debug, Clone)]
pub struct CompletionStore {
    root: PathBuf,
    collection_size: TokenId,
    extension: String,
}

impl CompletionStore {
    /// Store rooted at `root` for a collection of `collection_size` tokens,
    /// writing `.png` assets.
    pub fn new(root: impl Into<PathBuf>, collection_size: TokenId) -> Self {
        Self {
            root: root.into(),
            collection_size,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Use a different asset extension (e.g. `webp`).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical asset path for `token_id`. Pure.
    pub fn path_for(&self, token_id: TokenId) -> PathBuf {
        self.root
            .join(asset_filename(token_id, self.collection_size, &self.extension))
    }

    /// Create the output directory if it does not exist.
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Whether `token_id` has a saved, non-empty asset.
    pub async fn is_complete(&self, token_id: TokenId) -> bool {
        match tokio::fs::metadata(self.path_for(token_id)).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    /// Count how many of `token_ids` are complete.
    pub async fn count_complete(&self, token_ids: impl IntoIterator<Item = TokenId>) -> usize {
        let mut count = 0;
        for token_id in token_ids {
            if self.is_complete(token_id).await {
                count += 1;
            }
        }
        count
    }

    /// Atomically write `bytes` as the asset for `token_id`, replacing any
    /// existing asset. Returns the canonical path.
    ///
    /// On failure the temp file is removed and the canonical path is left
    /// exactly as it was.
    pub async fn commit(&self, token_id: TokenId, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::EmptyPayload(token_id));
        }

        let path = self.path_for(token_id);
        let temp = self.temp_path_for(token_id);

        if let Err(source) = write_then_rename(&temp, &path, bytes).await {
            if let Err(e) = tokio::fs::remove_file(&temp).await {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %temp.display(), error = %e, "Failed to remove temp file");
                }
            }
            return Err(StoreError::Io { path, source });
        }

        Ok(path)
    }

    /// Remove temp files left behind by an interrupted run.
    ///
    /// Returns the number of files removed. Canonical assets are never
    /// touched.
    pub async fn sweep_stale_temps(&self) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if is_temp_name(name) && entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                tracing::debug!(file = name, "Removed stale temp file");
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Hidden, unique sibling of the canonical path, e.g. `.0042.<uuid>.part`.
    fn temp_path_for(&self, token_id: TokenId) -> PathBuf {
        let width = pad_width(self.collection_size);
        self.root.join(format!(
            ".{token_id:0width$}.{}{TEMP_SUFFIX}",
            uuid::Uuid::new_v4().simple()
        ))
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

async fn write_then_rename(temp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(temp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(temp, path).await
}
